use storefront_core::{Markup, Payload};

use super::header;
use crate::registry::{Command, OverlayContent, RenderContext, Wiring};

pub const DELETE_FORM: &str = "delete-data-form";
pub const DELETE_STATUS_NODE: &str = "delete-status";

/// Lets a visitor ask for their personal data to be removed.
pub struct DeleteDataOverlay;

impl OverlayContent for DeleteDataOverlay {
    fn render(&self, _payload: &Payload, _ctx: &RenderContext<'_>) -> Markup {
        Markup::new(format!(
            concat!(
                r#"<section class="module-overlay delete-data" data-overlay="delete-data">{header}"#,
                r#"<p>Enter the email address you used with us and we will remove the personal data associated with it.</p>"#,
                r#"<form data-form="{form}" novalidate>"#,
                r#"<label>Email <input type="email" name="email" autocomplete="email" required></label>"#,
                r#"<button type="submit">Request deletion</button>"#,
                "</form>",
                r#"<div class="status" role="status" data-node="{status}"></div>"#,
                "</section>"
            ),
            header = header("Delete my data"),
            form = DELETE_FORM,
            status = DELETE_STATUS_NODE,
        ))
    }

    fn attach(&self, _payload: &Payload, _ctx: &RenderContext<'_>, wiring: &mut Wiring) {
        wiring.on_click("close", Command::Close);
        wiring.on_submit(DELETE_FORM, Command::SubmitDeletion);
    }
}
