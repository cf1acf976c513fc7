use storefront_core::markup::escape;
use storefront_core::{Markup, Payload};

use super::{BuiltinOverlay, CHECKOUT_STATUS_NODE, header};
use crate::registry::{Command, LiveValue, OverlayContent, RenderContext, Wiring};

pub struct CheckoutOverlay;

impl OverlayContent for CheckoutOverlay {
    fn render(&self, _payload: &Payload, ctx: &RenderContext<'_>) -> Markup {
        let mut html = String::from(r#"<section class="module-overlay checkout" data-overlay="checkout">"#);
        html.push_str(&header("Checkout"));
        html.push_str(r#"<ul class="order-summary">"#);
        for item in ctx.cart.items() {
            html.push_str(&format!(
                "<li>{} &times; {} <span>{}</span></li>",
                item.quantity,
                escape(&item.name),
                item.line_total()
            ));
        }
        html.push_str(&format!(
            concat!(
                "</ul>",
                r#"<p class="order-total">Total <strong data-node="cart-total">{total}</strong></p>"#,
                r#"<p class="status" role="status" data-node="{status}"></p>"#,
                r#"<button data-action="back-to-cart">Back to cart</button>"#,
                r#"<button class="primary" data-action="pay">Pay securely</button>"#,
                "</section>"
            ),
            total = ctx.cart.formatted_total(),
            status = CHECKOUT_STATUS_NODE,
        ));
        Markup::new(html)
    }

    fn attach(&self, _payload: &Payload, _ctx: &RenderContext<'_>, wiring: &mut Wiring) {
        wiring.on_click("close", Command::Close);
        wiring.on_click(
            "back-to-cart",
            Command::LoadAction {
                action: BuiltinOverlay::Cart.id(),
                payload: Payload::new(),
            },
        );
        wiring.on_click("pay", Command::BeginCheckout);
        wiring.live("cart-total", LiveValue::Total);
    }
}
