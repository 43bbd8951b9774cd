//! The HTML view catalog. The request pipeline only knows view names
//! and contexts; everything about markup lives here.

use karantene_api::context::{NO_ACTIVITY, NO_STATUS, PageContext};
use karantene_api::views::Views;

pub fn catalog() -> Views {
    let mut views = Views::new();

    views.register("login", |ctx| {
        base(
            ctx,
            "<form method=\"post\" action=\"/\">\
             <label>Kirkegård <input name=\"kirkegard\"></label> \
             <label>Strindtnavn <input name=\"strindtnavn\" placeholder=\"#XXX navn\"></label> \
             <button type=\"submit\">Inn i hybelen</button>\
             </form>"
                .to_string(),
        )
    });

    views.register("main", |ctx| {
        let mut body = String::new();
        match &ctx.status {
            Some(status) => body.push_str(&format!(
                "<section id=\"status\"><strong>{}</strong> <small>{} ({})</small></section>",
                escape(&status.text),
                escape(&status.user),
                status.time
            )),
            None => body.push_str(&format!(
                "<section id=\"status\">{}</section>",
                escape(NO_STATUS)
            )),
        }

        body.push_str("<ul id=\"meldinger\">");
        for msg in &ctx.messages {
            body.push_str(&format!(
                "<li><b>{}</b>: {}</li>",
                escape(&msg.user),
                escape(&msg.text)
            ));
        }
        body.push_str("</ul>");

        body.push_str(
            "<form method=\"post\" action=\"/message\">\
             <input name=\"msg\" autocomplete=\"off\">\
             <button type=\"submit\">Send</button>\
             </form>\
             <button id=\"cheers\">Skål!</button>",
        );
        base(ctx, body)
    });

    views.register("aktivitet", |ctx| {
        let mut body = String::from("<ul id=\"aktivitet\">");
        if let Some(entries) = ctx.extra.as_ref().and_then(|v| v.as_array()) {
            for entry in entries {
                let text = entry.get("text").and_then(|v| v.as_str()).unwrap_or("");
                let time = entry.get("time").and_then(|v| v.as_str()).unwrap_or("");
                body.push_str(&format!("<li>{} <small>{}</small></li>", escape(text), time));
            }
        }
        body.push_str("</ul>");
        base(ctx, body)
    });

    views.register("status", |ctx| {
        let mut body = String::from(
            "<form method=\"post\" action=\"/status\">\
             <input name=\"txt\">\
             <button type=\"submit\">Sett status</button>\
             </form><ul id=\"historikk\">",
        );
        if let Some(entries) = ctx.extra.as_ref().and_then(|v| v.as_array()) {
            for entry in entries {
                let text = entry.get("text").and_then(|v| v.as_str()).unwrap_or("");
                let user = entry.get("user").and_then(|v| v.as_str()).unwrap_or("");
                body.push_str(&format!(
                    "<li>{} <small>{}</small></li>",
                    escape(text),
                    escape(user)
                ));
            }
        }
        body.push_str("</ul>");
        base(ctx, body)
    });

    views.register("tilganger", |ctx| {
        let mut body = String::from("<table id=\"tilganger\"><tr><th>strindtnavn</th><th>kvissmaster</th><th>status</th><th>tilganger</th></tr>");
        if let Some(entries) = ctx.extra.as_ref().and_then(|v| v.as_array()) {
            for entry in entries {
                let user = entry.get("user").and_then(|v| v.as_str()).unwrap_or("");
                body.push_str(&format!(
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                    escape(user),
                    flag(entry, "kvissmaster"),
                    flag(entry, "status"),
                    flag(entry, "tilganger"),
                ));
            }
        }
        body.push_str(
            "</table>\
             <form method=\"post\" action=\"/tilganger\">\
             <input name=\"user\" placeholder=\"#XXX navn\">\
             <label>kvissmaster <input type=\"checkbox\" name=\"kvissmaster\" value=\"true\"></label>\
             <label>status <input type=\"checkbox\" name=\"status\" value=\"true\"></label>\
             <label>tilganger <input type=\"checkbox\" name=\"tilganger\" value=\"true\"></label>\
             <button type=\"submit\">Lagre</button>\
             </form>",
        );
        base(ctx, body)
    });

    views.register("kviss", |ctx| {
        let body = match ctx.extra.as_ref().filter(|v| !v.is_null()) {
            Some(quiz) => {
                let name = quiz.get("name").and_then(|v| v.as_str()).unwrap_or("");
                let description = quiz
                    .get("description")
                    .and_then(|v| v.as_str())
                    .unwrap_or("");
                format!(
                    "<section id=\"kviss\"><h2>{}</h2><p>{}</p></section>",
                    escape(name),
                    escape(description)
                )
            }
            None => "<section id=\"kviss\">Ingen kviss enda...</section>".to_string(),
        };
        base(ctx, body)
    });

    views.register("agenda", |ctx| {
        base(
            ctx,
            "<section id=\"agenda\"><h2>Agenda</h2>\
             <p>18:00 felles middag over video</p>\
             <p>20:00 kviss</p>\
             <p>21:00 skål fra balkongene</p></section>"
                .to_string(),
        )
    });

    views.register("hello", |ctx| base(ctx, "<p>Hello, World!</p>".to_string()));

    views.register("page_not_found", |ctx| {
        base(ctx, "<p>Denne siden finnes ikke.</p>".to_string())
    });

    views.register("forbidden", |ctx| {
        base(ctx, "<p>Spør den som styrer tilgangene.</p>".to_string())
    });

    views
}

fn base(ctx: &PageContext, body: String) -> String {
    let mut header = format!("<h1>{}</h1>", ctx.app_name);
    if let Some(error) = &ctx.error {
        header.push_str(&format!("<p class=\"error\">{}</p>", escape(error)));
    }
    if let Some(user) = &ctx.user {
        header.push_str(&format!(
            "<p>{} &mdash; {}</p>\
             <form method=\"post\" action=\"/logout\"><button>Dra hjem</button></form>",
            escape(user),
            escape(ctx.latest.as_deref().unwrap_or(NO_ACTIVITY)),
        ));
    }
    format!(
        "<!DOCTYPE html>\
         <html lang=\"no\"><head><meta charset=\"utf-8\"><title>{}</title></head>\
         <body><header>{}</header><main>{}</main></body></html>",
        ctx.app_name, header, body
    )
}

fn flag(entry: &serde_json::Value, name: &str) -> &'static str {
    if entry.get(name).and_then(|v| v.as_bool()).unwrap_or(false) {
        "ja"
    } else {
        "nei"
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
