use storefront_core::markup::escape;
use storefront_core::{Markup, Payload};

use super::{BuiltinOverlay, header};
use crate::registry::{Command, LiveValue, OverlayContent, RenderContext, Wiring};

/// Cart contents with quantity controls. Quantity changes patch the live
/// nodes; adding or removing a line re-renders the overlay.
pub struct CartOverlay;

impl OverlayContent for CartOverlay {
    fn render(&self, _payload: &Payload, ctx: &RenderContext<'_>) -> Markup {
        let cart = ctx.cart;
        let mut html = String::from(r#"<section class="module-overlay cart" data-overlay="cart">"#);
        html.push_str(&header("Your Cart"));

        if cart.is_empty() {
            html.push_str(
                r#"<p class="empty">Your cart is empty.</p><button data-action="continue-shopping">Continue shopping</button></section>"#,
            );
            return Markup::new(html);
        }

        html.push_str(r#"<ul class="cart-lines">"#);
        for item in cart.items() {
            html.push_str(&format!(
                concat!(
                    r#"<li class="cart-line" data-item="{id}">"#,
                    r#"<span class="name">{name}</span>"#,
                    r#"<span class="unit-price">{price}</span>"#,
                    r#"<button data-action="qty-dec:{id}" aria-label="Decrease">&minus;</button>"#,
                    r#"<span class="qty" data-node="qty:{id}">{qty}</span>"#,
                    r#"<button data-action="qty-inc:{id}" aria-label="Increase">+</button>"#,
                    r#"<span class="line-total" data-node="line:{id}">{line}</span>"#,
                    r#"<button data-action="remove:{id}">Remove</button>"#,
                    "</li>"
                ),
                id = escape(&item.id),
                name = escape(&item.name),
                price = item.price,
                qty = item.quantity,
                line = item.line_total(),
            ));
        }
        html.push_str("</ul>");
        html.push_str(&format!(
            concat!(
                r#"<dl class="cart-summary">"#,
                r#"<dt>Items</dt><dd data-node="cart-count">{count}</dd>"#,
                r#"<dt>Subtotal</dt><dd data-node="cart-subtotal">{total}</dd>"#,
                r#"<dt>Total</dt><dd data-node="cart-total">{total}</dd>"#,
                "</dl>",
                r#"<button data-action="clear-cart">Empty cart</button>"#,
                r#"<button class="primary" data-action="checkout">Checkout</button>"#,
                "</section>"
            ),
            count = cart.item_count(),
            total = cart.formatted_total(),
        ));
        Markup::new(html)
    }

    fn attach(&self, _payload: &Payload, ctx: &RenderContext<'_>, wiring: &mut Wiring) {
        wiring.on_click("close", Command::Close);
        wiring.on_click(
            "continue-shopping",
            Command::LoadAction {
                action: BuiltinOverlay::Products.id(),
                payload: Payload::new(),
            },
        );
        wiring.on_click("clear-cart", Command::ClearCart);
        wiring.on_click(
            "checkout",
            Command::LoadAction {
                action: BuiltinOverlay::Checkout.id(),
                payload: Payload::new(),
            },
        );

        for item in ctx.cart.items() {
            let id = &item.id;
            wiring.on_click(format!("qty-dec:{id}"), Command::ChangeQuantity { item_id: id.clone(), delta: -1 });
            wiring.on_click(format!("qty-inc:{id}"), Command::ChangeQuantity { item_id: id.clone(), delta: 1 });
            wiring.on_click(format!("remove:{id}"), Command::RemoveItem { item_id: id.clone() });
            wiring.live(format!("qty:{id}"), LiveValue::LineQuantity(id.clone()));
            wiring.live(format!("line:{id}"), LiveValue::LineTotal(id.clone()));
        }
        wiring.live("cart-count", LiveValue::ItemCount);
        wiring.live("cart-subtotal", LiveValue::Subtotal);
        wiring.live("cart-total", LiveValue::Total);
        wiring.rerender_on_cart_structure();
    }
}
