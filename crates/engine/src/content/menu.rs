use storefront_core::markup::escape;
use storefront_core::payload::payload;
use storefront_core::{Markup, Payload};

use super::{BuiltinOverlay, header};
use crate::registry::{Command, LiveValue, OverlayContent, RenderContext, Wiring};

/// The hamburger menu.
pub struct MenuOverlay;

struct MenuItem {
    element: &'static str,
    label: &'static str,
    target: BuiltinOverlay,
    section: Option<&'static str>,
}

const ITEMS: [MenuItem; 5] = [
    MenuItem { element: "menu-products", label: "Shop", target: BuiltinOverlay::Products, section: None },
    MenuItem { element: "menu-workshops", label: "Workshops", target: BuiltinOverlay::Products, section: Some("workshops") },
    MenuItem { element: "menu-cart", label: "Cart", target: BuiltinOverlay::Cart, section: None },
    MenuItem { element: "menu-contact", label: "Contact", target: BuiltinOverlay::Contact, section: None },
    MenuItem { element: "menu-delete-data", label: "Delete my data", target: BuiltinOverlay::DeleteData, section: None },
];

impl OverlayContent for MenuOverlay {
    fn render(&self, _payload: &Payload, ctx: &RenderContext<'_>) -> Markup {
        let mut html = String::from(r#"<nav class="menu-overlay" data-overlay="menu">"#);
        html.push_str(&header("Menu"));
        html.push_str("<ul>");
        for item in &ITEMS {
            html.push_str(&format!(r#"<li><button data-action="{}">{}"#, item.element, escape(item.label)));
            if item.target == BuiltinOverlay::Cart {
                html.push_str(&format!(
                    r#" <span class="badge" data-node="cart-count">{}</span>"#,
                    ctx.cart.item_count()
                ));
            }
            html.push_str("</button></li>");
        }
        html.push_str("</ul></nav>");
        Markup::new(html)
    }

    fn attach(&self, _payload: &Payload, _ctx: &RenderContext<'_>, wiring: &mut Wiring) {
        wiring.on_click("close", Command::Close);
        for item in &ITEMS {
            let payload = item.section.map(|s| payload([("section", s)])).unwrap_or_default();
            wiring.on_click(
                item.element,
                Command::LoadAction {
                    action: item.target.id(),
                    payload,
                },
            );
        }
        wiring.live("cart-count", LiveValue::ItemCount);
    }
}
