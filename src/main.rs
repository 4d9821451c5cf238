use std::io::Write;
use std::time::Duration;

use anyhow::Context as _;
use futures::StreamExt;
use futures::executor::block_on;
use runtime_render::{
    Component, Context, Element, Node, Props, RenderConfig, RenderOptions, RequestContext,
    render_to_stream,
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Resolves after `delay` on a helper thread.
async fn sleep(delay: Duration) {
    let (tx, rx) = futures::channel::oneshot::channel::<()>();
    std::thread::spawn(move || {
        std::thread::sleep(delay);
        tx.send(()).ok();
    });
    if rx.await.is_err() {
        log::debug!("sleep timer thread dropped its sender");
    }
}

fn demo_page() -> Node {
    let theme = Context::new("theme", "light".to_string());

    let badge = {
        let theme = theme.clone();
        Component::pure("Badge", move |_, ctx| {
            Element::new("span")
                .attr("class", format!("badge {}", ctx.use_context(&theme)))
                .child("new")
                .into()
        })
    };

    let comments = {
        let badge = badge.clone();
        Component::new("Comments", move |props, _| {
            let badge = badge.clone();
            async move {
                let count = props.get("count").and_then(|v| v.as_u64()).unwrap_or(0);
                sleep(Duration::from_millis(200)).await;
                let items = (1..=count).map(|n| {
                    Node::from(Element::new("li").child(format!("comment {n} ")).child(badge.invoke(Props::new())))
                });
                Ok(Node::from(Element::new("ul").children(items)))
            }
        })
        .with_suspense(|_, _| Element::new("p").child("Loading comments...").into())
        .with_error(|props, _| {
            let cause = props.error().map(|e| e.to_string()).unwrap_or_default();
            Element::new("p").attr("class", "error").child(cause).into()
        })
    };

    let body = Element::new("body")
        .child(Element::new("h1").child("Streaming demo"))
        .child(theme.provide(
            "dark".to_string(),
            Node::list([
                badge.invoke(Props::new()),
                comments.invoke(Props::new().with("count", 3)),
            ]),
        ))
        .child(Element::new("footer").child(badge.invoke(Props::new())));

    Element::new("html")
        .attr("lang", "en")
        .child(Element::new("head").child(Element::new("title").child("ssr-stream")))
        .child(body)
        .into()
}

fn load_config() -> anyhow::Result<RenderConfig> {
    let Some(path) = std::env::args().nth(1) else {
        return Ok(RenderConfig::default());
    };
    let src = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    RenderConfig::from_toml_str(&src).with_context(|| format!("parsing {path}"))
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let config = load_config()?;
    let options = RenderOptions::default().with_config(config);
    let mut stream = render_to_stream(demo_page(), RequestContext::new(), options);

    let stdout = std::io::stdout();
    block_on(async {
        let mut out = stdout.lock();
        let mut chunks = 0usize;
        while let Some(chunk) = stream.next().await {
            out.write_all(chunk?.as_bytes())?;
            out.flush()?;
            chunks += 1;
        }
        writeln!(out)?;
        log::info!("rendered {chunks} chunk(s)");
        anyhow::Ok(())
    })
}
