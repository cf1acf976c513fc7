use storefront_core::markup::escape;
use storefront_core::payload::{payload, text};
use storefront_core::{Markup, Payload};

use super::{BuiltinOverlay, header};
use crate::registry::{Command, LiveValue, OverlayContent, RenderContext, Wiring};

/// Product listing for one catalog section, with section tabs.
pub struct ProductsOverlay;

fn selected_section<'a>(payload: &'a Payload, ctx: &RenderContext<'a>) -> Option<&'a str> {
    text(payload, "section").or_else(|| ctx.catalog.sections().first().copied())
}

impl OverlayContent for ProductsOverlay {
    fn render(&self, payload: &Payload, ctx: &RenderContext<'_>) -> Markup {
        let section = selected_section(payload, ctx);
        let mut html = String::from(r#"<section class="module-overlay products" data-overlay="products">"#);
        html.push_str(&header(section.unwrap_or("Shop")));

        html.push_str(r#"<div class="section-tabs">"#);
        for name in ctx.catalog.sections() {
            let class = if Some(name) == section { "tab active" } else { "tab" };
            html.push_str(&format!(
                r#"<button class="{class}" data-action="section:{0}">{0}</button>"#,
                escape(name)
            ));
        }
        html.push_str("</div>");

        html.push_str(r#"<ul class="product-grid">"#);
        let mut shown = 0;
        for product in section.into_iter().flat_map(|s| ctx.catalog.in_section(s)) {
            shown += 1;
            let image = product
                .image
                .as_deref()
                .map(|src| format!(r#"<img src="{}" alt="">"#, escape(src)))
                .unwrap_or_default();
            html.push_str(&format!(
                r#"<li class="product" data-product="{id}">{image}<h3>{name}</h3><p>{desc}</p><span class="price">{price}</span><button data-action="add:{id}">Add to cart</button></li>"#,
                id = escape(&product.id),
                name = escape(&product.name),
                desc = escape(&product.description),
                price = product.price,
            ));
        }
        html.push_str("</ul>");
        if shown == 0 {
            html.push_str(r#"<p class="empty">Nothing here yet.</p>"#);
        }

        html.push_str(&format!(
            r#"<footer><button data-action="view-cart">View cart (<span data-node="cart-count">{}</span>)</button></footer></section>"#,
            ctx.cart.item_count()
        ));
        Markup::new(html)
    }

    fn attach(&self, payload: &Payload, ctx: &RenderContext<'_>, wiring: &mut Wiring) {
        wiring.on_click("close", Command::Close);
        for name in ctx.catalog.sections() {
            wiring.on_click(
                format!("section:{name}"),
                Command::LoadAction {
                    action: BuiltinOverlay::Products.id(),
                    payload: payload_for(name),
                },
            );
        }
        if let Some(section) = selected_section(payload, ctx) {
            for product in ctx.catalog.in_section(section) {
                wiring.on_click(
                    format!("add:{}", product.id),
                    Command::AddToCart { product_id: product.id.clone() },
                );
            }
        }
        wiring.on_click(
            "view-cart",
            Command::LoadAction {
                action: BuiltinOverlay::Cart.id(),
                payload: Payload::new(),
            },
        );
        wiring.live("cart-count", LiveValue::ItemCount);
    }
}

fn payload_for(section: &str) -> Payload {
    payload([("section", section)])
}
