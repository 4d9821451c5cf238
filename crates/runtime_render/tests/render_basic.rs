mod common;

use common::{assert_html, render_html, render_with};
use html_test_support::yield_now;
use runtime_render::{
    AttrValue, Component, Element, Node, Props, RenderConfig, RenderOptions, RequestContext,
    StoreKey,
};

#[test]
fn element_with_class_and_text() {
    let root = Element::new("div").attr("class", "test").child("Hello World");
    assert_html(root.into(), "<div class=\"test\">Hello World</div>");
}

#[test]
fn text_is_escaped_and_raw_html_is_not() {
    let root = Node::list([Node::text("<b>"), Node::raw("<b>")]);
    assert_html(root, "&lt;b&gt;<b>");
}

#[test]
fn attribute_values_are_escaped_once() {
    let root = Element::new("a")
        .attr("title", "a&b \"c\"")
        .attr("hidden", true)
        .attr("draggable", false);
    assert_html(root.into(), "<a title=\"a&amp;b &quot;c&quot;\" hidden></a>");
}

#[test]
fn output_is_depth_first_in_order() {
    let slow = Component::new("Slow", |props: Props, _| async move {
        yield_now().await;
        Ok(Node::text(props.get_str("label").unwrap_or_default().to_string()))
    });
    let pair = Component::pure("Pair", |_, _| Node::list([Node::text("x"), Node::text("y")]));

    let root = Element::new("ul")
        .child(Element::new("li").child("a"))
        .child(slow.invoke(Props::new().with("label", "slow")))
        .child(Element::new("li").child(pair.invoke(Props::new())))
        .child(Element::new("li").child("b"));
    assert_html(root.into(), "<ul><li>a</li>slow<li>xy</li><li>b</li></ul>");
}

#[test]
fn fragments_lists_and_empty_nodes_write_only_children() {
    let root = Element::new("p")
        .child(Node::fragment([Node::text("a"), Node::Empty, Node::text("b")]))
        .child(Node::list([Node::text("c")]))
        .child(Option::<Node>::None);
    assert_html(root.into(), "<p>abc</p>");
}

#[test]
fn numbers_print_without_trailing_fraction() {
    let root = Node::list([
        Node::from(42),
        Node::text(" "),
        Node::from(1.5),
        Node::text(" "),
        Node::from(-0.0),
    ]);
    assert_html(root, "42 1.5 0");
}

#[test]
fn void_elements_have_no_closing_tag() {
    let root = Element::new("p")
        .child(Element::new("img").attr("src", "a.png"))
        .child(Element::new("br"))
        .child("end");
    assert_html(root.into(), "<p><img src=\"a.png\"><br>end</p>");
}

#[test]
fn pending_nodes_render_in_place() {
    let root = Node::list([
        Node::text("a"),
        Node::pending(async {
            yield_now().await;
            Node::text("b")
        }),
        Node::text("c"),
    ]);
    assert_html(root, "abc");
}

#[test]
fn html_root_gets_doctype() {
    let root = Element::new("html").child(Element::new("body"));
    assert_html(root.clone().into(), "<!DOCTYPE html><html><body></body></html>");

    let options = RenderOptions::default().with_config(RenderConfig {
        doctype: false,
        ..RenderConfig::default()
    });
    let got = render_with(root.into(), RequestContext::new(), options);
    assert_eq!(got.concat(), "<html><body></body></html>");
}

fn head_override() -> Component {
    Component::pure("Head", |_, _| {
        Element::new("meta").attr("id", "viewport").attr("name", "viewport").into()
    })
}

#[test]
fn head_override_opens_head_and_duplicate_ids_are_skipped() {
    let root = Element::new("html")
        .child(
            Element::new("head")
                .child(Element::new("meta").attr("id", "viewport").attr("content", "dup"))
                .child(Element::new("title").child("T")),
        )
        .child(Element::new("body").child(Element::new("p").attr("id", "viewport")));
    let options = RenderOptions::default().with_head(head_override());
    let got = render_with(root.into(), RequestContext::new(), options);
    assert_eq!(
        got.concat(),
        "<!DOCTYPE html><html><head><meta id=\"viewport\" name=\"viewport\"><title>T</title></head>\
         <body><p id=\"viewport\"></p></body></html>"
    );
}

#[test]
fn body_without_head_gets_synthetic_head() {
    let root = Element::new("html").child(Element::new("body").child("hi"));
    let options = RenderOptions::default().with_head(head_override());
    let got = render_with(root.into(), RequestContext::new(), options);
    assert_eq!(
        got.concat(),
        "<!DOCTYPE html><html><head><meta id=\"viewport\" name=\"viewport\"></head><body>hi</body></html>"
    );
}

#[test]
fn custom_attribute_renderer_sees_request() {
    const NONCE: StoreKey<String> = StoreKey::new("nonce");
    let renderer = |attrs: &[(String, AttrValue)], ctx: &RequestContext, tag: &str| {
        let mut out = html::render_attributes(attrs);
        if tag == "script" {
            if let Some(nonce) = ctx.get(&NONCE) {
                out.push_str(&format!(" nonce=\"{nonce}\""));
            }
        }
        out
    };
    let ctx = RequestContext::builder().value(&NONCE, "r4nd".to_string()).build();
    let root = Node::list([
        Node::from(Element::new("script").attr("src", "/app.js")),
        Node::from(Element::new("div")),
    ]);
    let got = render_with(root, ctx, RenderOptions::default().with_attributes(renderer));
    assert_eq!(
        got.concat(),
        "<script src=\"/app.js\" nonce=\"r4nd\"></script><div></div>"
    );
}

#[test]
fn components_read_request_store() {
    const USER: StoreKey<String> = StoreKey::new("user");
    let greet = Component::pure("Greet", |_, ctx| {
        Node::text(format!("hi {}", ctx.get(&USER).unwrap_or_default()))
    });
    let ctx = RequestContext::builder().value(&USER, "ada".to_string()).build();
    let got = render_with(greet.invoke(Props::new()), ctx, RenderOptions::default());
    assert_eq!(got.concat(), "hi ada");
}

#[test]
fn plain_text_root_renders() {
    assert_eq!(render_html(Node::text("only")), "only");
}
