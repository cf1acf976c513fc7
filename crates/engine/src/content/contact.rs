use storefront_core::markup::escape;
use storefront_core::{Markup, Payload};

use super::header;
use crate::registry::{Command, OverlayContent, RenderContext, Wiring};

pub const COPY_STATUS_NODE: &str = "copy-status";

pub struct ContactOverlay;

impl OverlayContent for ContactOverlay {
    fn render(&self, _payload: &Payload, ctx: &RenderContext<'_>) -> Markup {
        let email = escape(&ctx.config.contact_email);
        Markup::new(format!(
            concat!(
                r#"<section class="module-overlay contact" data-overlay="contact">{header}"#,
                r#"<p>Questions about an order or a workshop? Write to us.</p>"#,
                r#"<p><a href="mailto:{email}">{email}</a> "#,
                r#"<button data-action="copy-email">Copy</button> "#,
                r#"<span class="status" data-node="{status}"></span></p>"#,
                "</section>"
            ),
            header = header("Contact"),
            email = email,
            status = COPY_STATUS_NODE,
        ))
    }

    fn attach(&self, _payload: &Payload, ctx: &RenderContext<'_>, wiring: &mut Wiring) {
        wiring.on_click("close", Command::Close);
        wiring.on_click(
            "copy-email",
            Command::CopyText {
                text: ctx.config.contact_email.clone(),
                status_node: COPY_STATUS_NODE.to_string(),
            },
        );
    }
}
