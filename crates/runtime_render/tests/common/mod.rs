#![allow(dead_code)]

use futures::executor::block_on;
use futures::{FutureExt, StreamExt};
use html_test_support::{Collected, collect_chunks, diff_lines};
use runtime_render::{
    Component, Context, Node, RenderError, RenderOptions, RenderStream, RequestContext,
    render_to_stream,
};

pub fn render(root: Node) -> Collected<RenderError> {
    render_with(root, RequestContext::new(), RenderOptions::default())
}

pub fn render_with(root: Node, ctx: RequestContext, options: RenderOptions) -> Collected<RenderError> {
    block_on(collect_chunks(render_to_stream(root, ctx, options)))
}

/// Full output of a render that must succeed.
pub fn render_html(root: Node) -> String {
    let got = render(root);
    assert!(got.error.is_none(), "unexpected error: {:?}", got.error);
    got.concat()
}

pub fn assert_html(root: Node, expected: &str) {
    let actual = render_html(root);
    assert_eq!(
        actual,
        expected,
        "\n{}",
        diff_lines(&[expected], &[actual.as_str()])
    );
}

/// Outcome of draining everything a stream can produce without waiting.
pub struct Pumped {
    pub text: String,
    pub ended: bool,
}

pub fn pump(stream: &mut RenderStream) -> Pumped {
    let mut text = String::new();
    loop {
        match stream.next().now_or_never() {
            Some(Some(Ok(chunk))) => text.push_str(&chunk),
            Some(Some(Err(err))) => panic!("render failed: {err}"),
            Some(None) => return Pumped { text, ended: true },
            None => return Pumped { text, ended: false },
        }
    }
}

/// Component printing the current value of `context`.
pub fn reader(context: &Context<String>) -> Component {
    let context = context.clone();
    Component::pure("Reader", move |_, ctx| Node::text(ctx.use_context(&context)))
}

pub fn theme() -> Context<String> {
    Context::new("theme", "light".to_string())
}

pub fn start(root: Node) -> RenderStream {
    render_to_stream(root, RequestContext::new(), RenderOptions::default())
}
