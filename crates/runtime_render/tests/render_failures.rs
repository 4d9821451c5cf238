mod common;

use std::rc::Rc;

use common::{assert_html, pump, render, render_with, theme};
use futures::executor::block_on;
use html_test_support::{gate, yield_times};
use runtime_render::{
    AbortSignal, Component, Element, Node, Props, RenderError, RenderOptions, RequestContext,
    render_to_stream, render_to_string,
};

fn failing(name: &str, message: &'static str) -> Component {
    Component::new(name, move |_, _| async move { Err(anyhow::anyhow!(message)) })
}

fn describe(props: &Props) -> String {
    props.error().map(|e| e.to_string()).unwrap_or_default()
}

#[test]
fn error_handler_replaces_failed_output_in_place() {
    let broken = failing("Broken", "x").with_error(|props, _| Node::text(format!("Error {}", describe(props))));
    let root = Node::list([
        Node::text("before"),
        broken.invoke(Props::new()),
        Node::text("after"),
    ]);
    assert_html(root, "beforeError xafter");
}

#[test]
fn async_error_handler_is_awaited() {
    let broken = failing("Broken", "db").with_async_error(|props, _| async move {
        yield_times(2).await;
        Ok(Node::text(format!("retry later ({})", describe(&props))))
    });
    let root = Element::new("section").child(broken.invoke(Props::new()));
    assert_html(root.into(), "<section>retry later (db)</section>");
}

#[test]
fn unhandled_failure_ends_stream_with_one_error() {
    let root = Node::list([
        Element::new("p").child("first").into(),
        failing("Broken", "x").invoke(Props::new()),
        Node::text("never"),
    ]);
    let got = render(root);
    assert_eq!(got.concat(), "<p>first</p>");
    assert_eq!(got.after_error, 0);
    let err = got.error.expect("render should fail");
    assert_eq!(err.to_string(), "component `Broken` failed: x");
    assert!(matches!(err, RenderError::Component { ref component, .. } if component == "Broken"));
}

#[test]
fn failing_error_handler_fails_the_render() {
    let broken = failing("Broken", "x").with_async_error(|_, _| async {
        Err(anyhow::anyhow!("handler broke"))
    });
    let got = render(Node::list([Node::text("a"), broken.invoke(Props::new())]));
    assert_eq!(got.concat(), "a");
    match got.error {
        Some(RenderError::Component { component, cause }) => {
            assert_eq!(component, "Broken");
            assert_eq!(cause.to_string(), "handler broke");
        }
        other => panic!("expected component error, got {other:?}"),
    }
}

#[test]
fn error_handler_does_not_cover_children() {
    let child = failing("Child", "deep");
    let parent = Component::pure("Parent", move |_, _| child.invoke(Props::new()))
        .with_error(|_, _| Node::text("parent fallback"));
    let got = render(parent.invoke(Props::new()));
    match got.error {
        Some(RenderError::Component { component, .. }) => assert_eq!(component, "Child"),
        other => panic!("expected child failure, got {other:?}"),
    }
}

#[test]
fn provider_is_cleared_when_a_child_fails() {
    let theme = theme();
    let ctx = RequestContext::new();
    let handle = ctx.clone();
    let root = theme.provide("dark".to_string(), failing("Broken", "x").invoke(Props::new()));
    let got = render_with(root, ctx, RenderOptions::default());
    assert!(got.error.is_some());
    assert_eq!(handle.contexts().live_entries(theme.id()), 0);
    assert_eq!(handle.use_context(&theme), "light");
}

#[test]
fn render_to_string_returns_first_error() {
    let result = block_on(render_to_string(
        failing("Broken", "x").invoke(Props::new()),
        RequestContext::new(),
        RenderOptions::default(),
    ));
    assert!(matches!(result, Err(RenderError::Component { .. })));
}

fn aborting_request() -> (AbortSignal, RequestContext) {
    let signal = AbortSignal::new();
    let ctx = RequestContext::builder().abort_signal(signal.clone()).build();
    (signal, ctx)
}

#[test]
fn abort_after_first_chunk_ends_stream_quietly() {
    let (signal, ctx) = aborting_request();
    let (mut opener, wait) = gate();
    let root = Node::list([
        Node::text("first"),
        Node::pending(async move {
            wait.wait().await;
            Node::text("second")
        }),
    ]);
    let mut stream = render_to_stream(root, ctx, RenderOptions::default());

    let first = pump(&mut stream);
    assert_eq!(first.text, "first");
    assert!(!first.ended);

    signal.abort();
    opener.open();
    let rest = pump(&mut stream);
    assert_eq!(rest.text, "");
    assert!(rest.ended);
}

#[test]
fn abort_drops_suspended_renders_in_flight() {
    let (signal, ctx) = aborting_request();
    let (mut opener, wait) = gate();
    let slow = Component::new("Slow", move |_, _| {
        let wait = wait.clone();
        async move {
            wait.wait().await;
            Ok(Node::text("late"))
        }
    })
    .with_suspense(|_, _| Node::text("Loading..."));
    let root = Node::list([slow.invoke(Props::new()), Node::text("tail")]);
    let mut stream = render_to_stream(root, ctx, RenderOptions::default());

    let first = pump(&mut stream);
    assert_eq!(first.text, "<div id=\"S:1\">Loading...</div>tail");
    assert!(!first.ended);

    signal.abort();
    opener.open();
    let rest = pump(&mut stream);
    assert!(!rest.text.contains("U:1"), "{}", rest.text);
    assert!(rest.ended);
}

#[test]
fn abort_from_another_thread_is_observed() {
    let (signal, ctx) = aborting_request();
    let (_opener, wait) = gate();
    let root = Node::list([
        Node::text("first"),
        Node::pending(async move {
            wait.wait().await;
            Node::Empty
        }),
    ]);
    let mut stream = render_to_stream(root, ctx, RenderOptions::default());
    assert_eq!(pump(&mut stream).text, "first");

    let remote = signal.clone();
    std::thread::spawn(move || remote.abort())
        .join()
        .expect("abort thread");
    assert!(signal.is_aborted());
    assert!(pump(&mut stream).ended);
}

#[test]
fn abort_before_start_produces_nothing() {
    let (signal, ctx) = aborting_request();
    signal.abort();
    let got = render_with(
        Element::new("p").child("never").into(),
        ctx,
        RenderOptions::default(),
    );
    assert!(got.chunks.is_empty());
    assert!(got.error.is_none());
}

#[test]
fn dropping_the_stream_releases_suspended_work() {
    let marker = Rc::new(());
    let (_opener, wait) = gate();
    let root = {
        let held = Rc::clone(&marker);
        let slow = Component::new("Slow", move |_, _| {
            let (held, wait) = (Rc::clone(&held), wait.clone());
            async move {
                wait.wait().await;
                Ok(Node::text(format!("{}", Rc::strong_count(&held))))
            }
        })
        .with_suspense(|_, _| Node::text("..."));
        slow.invoke(Props::new())
    };
    let mut stream = render_to_stream(root, RequestContext::new(), RenderOptions::default());
    assert!(!pump(&mut stream).ended);
    assert!(Rc::strong_count(&marker) > 1);

    drop(stream);
    assert_eq!(Rc::strong_count(&marker), 1);
}
