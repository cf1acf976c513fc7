use storefront_core::{Markup, Payload};

use super::header;
use crate::registry::{Command, OverlayContent, RenderContext, Wiring};

/// Shown for overlay ids nothing is registered under.
pub struct ErrorOverlay;

impl OverlayContent for ErrorOverlay {
    fn render(&self, _payload: &Payload, _ctx: &RenderContext<'_>) -> Markup {
        Markup::new(format!(
            r#"<section class="module-overlay error-overlay" data-overlay="error">{}<p>This section could not be loaded. Please close it and try again.</p><button data-action="dismiss">Close</button></section>"#,
            header("Something went wrong")
        ))
    }

    fn attach(&self, _payload: &Payload, _ctx: &RenderContext<'_>, wiring: &mut Wiring) {
        wiring.on_click("close", Command::Close);
        wiring.on_click("dismiss", Command::Close);
    }
}
