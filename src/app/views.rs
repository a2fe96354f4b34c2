//! HTML rendering for the four pages.

use crate::core::service::{Listing, LookupOutcome, ManageOutcome, SearchOutcome};
use crate::domain::model::PostalRecord;
use std::fmt::Write;

/// Escapes text for use in element content and quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, is_admin: bool, body: &str) -> String {
    let nav = if is_admin {
        r#"<a href="/search">Pesquisa</a> <a href="/upload">Importar CSV</a> <a href="/gestao/codigos">Gestão</a>
<form method="post" action="/logout" class="inline"><button type="submit">Sair</button></form>"#
    } else {
        r#"<a href="/search">Pesquisa</a> <a href="/upload">Importar CSV</a> <a href="/login">Entrar</a>"#
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="pt">
<head><meta charset="utf-8"><title>{title}</title></head>
<body>
<nav>{nav}</nav>
<main>
<h1>{title}</h1>
{body}
</main>
</body>
</html>
"#,
        title = escape(title),
        nav = nav,
        body = body
    )
}

fn alert(out: &mut String, class: &str, text: Option<&str>) {
    if let Some(text) = text {
        let _ = writeln!(out, r#"<p class="{}">{}</p>"#, class, escape(text));
    }
}

fn record_table(out: &mut String, record: &PostalRecord) {
    let _ = writeln!(
        out,
        "<table class=\"record\">\n<tr><th>CP</th><td>{}</td></tr>\n<tr><th>Localidade</th><td>{}</td></tr>\n\
         <tr><th>Giro</th><td>{}</td></tr>\n<tr><th>Centro</th><td>{}</td></tr>\n<tr><th>Sábado</th><td>{}</td></tr>\n</table>",
        escape(&record.cp),
        escape(&record.localidade),
        escape(&record.giro),
        escape(&record.centro),
        escape(&record.sabado)
    );
}

fn external_panel(out: &mut String, external: Option<&LookupOutcome>) {
    let Some(external) = external else {
        return;
    };

    out.push_str("<section class=\"external\">\n<h2>Dados da API externa</h2>\n");
    match external {
        Ok(entries) => {
            for entry in entries.iter() {
                out.push_str("<dl>\n");
                for (key, value) in &entry.data {
                    let value = match value {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    let _ = writeln!(out, "<dt>{}</dt><dd>{}</dd>", escape(key), escape(&value));
                }
                out.push_str("</dl>\n");
            }
        }
        Err(e) => alert(out, "api-error", Some(&e.to_string())),
    }
    out.push_str("</section>\n");
}

pub fn login_page(error: Option<&str>, next: &str) -> String {
    let mut body = String::new();
    alert(&mut body, "error", error);
    let _ = write!(
        body,
        r#"<form method="post" action="/login">
<input type="hidden" name="next" value="{}">
<label>Utilizador <input name="username" autocomplete="username"></label>
<label>Palavra-passe <input name="password" type="password" autocomplete="current-password"></label>
<button type="submit">Entrar</button>
</form>"#,
        escape(next)
    );
    layout("Entrar", false, &body)
}

pub fn search_page(is_admin: bool, outcome: &SearchOutcome, error: Option<&str>) -> String {
    let mut body = String::new();
    let _ = writeln!(
        body,
        r#"<form method="get" action="/search">
<label>Código postal <input name="postalCode" value="{}" placeholder="XXXX-XXX"></label>
<button type="submit">Pesquisar</button>
</form>"#,
        escape(&outcome.postal_code)
    );

    alert(&mut body, "error", error);
    alert(&mut body, "info", outcome.not_found_message.as_deref());
    if let Some(record) = &outcome.record {
        record_table(&mut body, record);
    }
    external_panel(&mut body, outcome.external.as_ref());

    layout("Pesquisa de códigos postais", is_admin, &body)
}

pub fn upload_page(is_admin: bool, message: Option<&str>, error: Option<&str>) -> String {
    let mut body = String::new();
    alert(&mut body, "success", message);
    alert(&mut body, "error", error);
    body.push_str(
        r#"<form method="post" action="/upload" enctype="multipart/form-data">
<label>Ficheiro CSV (separado por ;) <input type="file" name="csvFile" accept=".csv"></label>
<button type="submit">Importar</button>
</form>"#,
    );
    layout("Importar CSV", is_admin, &body)
}

fn listing_section(out: &mut String, listing: &Listing) {
    let filters = &listing.filters;
    let selected = |flag: &str| if filters.sabado == flag { " selected" } else { "" };

    let _ = writeln!(
        out,
        r#"<section class="listing">
<h2>Registos</h2>
<form method="get" action="/gestao/codigos">
<label>Localidade <input name="localidade" value="{}"></label>
<label>Prefixo <input name="prefixo" value="{}"></label>
<label>Sábado <select name="sabado"><option value="">Todos</option><option value="S"{}>S</option><option value="N"{}>N</option></select></label>
<button type="submit">Filtrar</button>
</form>"#,
        escape(&filters.localidade),
        escape(&filters.prefixo),
        selected("S"),
        selected("N")
    );

    out.push_str("<table>\n<tr><th>CP</th><th>Localidade</th><th>Giro</th><th>Sábado</th></tr>\n");
    for record in &listing.records {
        let _ = writeln!(
            out,
            r#"<tr><td><a href="/gestao/codigos?postalCode={}">{}</a></td><td>{}</td><td>{}</td><td>{}</td></tr>"#,
            urlencoding::encode(&record.cp),
            escape(&record.cp),
            escape(&record.localidade),
            escape(&record.giro),
            escape(&record.sabado)
        );
    }
    out.push_str("</table>\n");

    let page = &listing.page;
    let link = |target: u64| {
        format!(
            "/gestao/codigos?localidade={}&amp;prefixo={}&amp;sabado={}&amp;pagina={}",
            urlencoding::encode(&filters.localidade),
            urlencoding::encode(&filters.prefixo),
            urlencoding::encode(&filters.sabado),
            target
        )
    };

    out.push_str("<p class=\"pagination\">");
    if page.page > 1 {
        let _ = write!(out, r#"<a href="{}">Anterior</a> "#, link(page.page - 1));
    }
    let _ = write!(
        out,
        "Página {} de {} ({} registos, {} por página)",
        page.page, page.total_pages, page.total_count, page.page_size
    );
    if page.page < page.total_pages {
        let _ = write!(out, r#" <a href="{}">Seguinte</a>"#, link(page.page + 1));
    }
    out.push_str("</p>\n</section>\n");
}

pub fn manage_page(outcome: &ManageOutcome, error: Option<&str>) -> String {
    let mut body = String::new();
    let _ = writeln!(
        body,
        r#"<form method="get" action="/gestao/codigos">
<label>Código postal <input name="postalCode" value="{}" placeholder="XXXX-XXX"></label>
<button type="submit">Consultar</button>
</form>"#,
        escape(&outcome.postal_code)
    );

    alert(&mut body, "success", outcome.message.as_deref());
    alert(&mut body, "error", error);
    alert(&mut body, "info", outcome.not_found_message.as_deref());
    if let Some(record) = &outcome.record {
        let _ = writeln!(body, r#"<p class="record-id">ID: {}</p>"#, record.id);
    }

    let form = &outcome.form;
    let _ = writeln!(
        body,
        r#"<form method="post" action="/gestao/codigos" class="record-form">
<label>Código postal <input name="cp" value="{}"></label>
<label>Localidade <input name="localidade" value="{}"></label>
<label>Giro <input name="giro" value="{}"></label>
<label>Centro <input name="centro" value="{}"></label>
<label>Sábado (S/N) <input name="sabado" value="{}" maxlength="1"></label>
<button type="submit">Guardar</button>
</form>"#,
        escape(&form.cp),
        escape(&form.localidade),
        escape(&form.giro),
        escape(&form.centro),
        escape(&form.sabado)
    );

    external_panel(&mut body, outcome.external.as_ref());

    match &outcome.listing {
        Some(listing) => listing_section(&mut body, listing),
        None => body.push_str(r#"<p><a href="/gestao/codigos">Voltar à lista</a></p>"#),
    }

    layout("Gestão de códigos postais", true, &body)
}
