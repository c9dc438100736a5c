/// minimal http echo: spawn an Echo actor behind the server, fire a couple of
/// pipelined requests, print the responses.
/// run with "cargo run --example http_echo"

use anyhow::Result;
use litebus_actor::{ActorSystem, BusAddress};
use litebus_async::Future;
use litebus_http::{HttpActor, HttpClient, HttpServer, HttpUrl, Request, Response};
use litebus_timer::TimerService;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let timer = Arc::new(TimerService::new());
    timer.run()?;

    let sys = ActorSystem::new("http-echo", timer.clone());
    let hsys = sys.clone_handle();

    let echo = HttpActor::new("Echo").with_route("/", |req: &Request| {
        Future::from_value(Response::ok_text(String::from_utf8_lossy(&req.body)))
    });
    hsys.spawn(echo, true, true)?;

    let server = HttpServer::new(hsys.clone(), BusAddress::new("http", "127.0.0.1", 0), None);
    let addr = server.start("127.0.0.1", 0).await?;
    println!("echo server on {addr}");

    let client = HttpClient::new(hsys.clone());
    let url = HttpUrl::new("http", "127.0.0.1", addr.port(), "/Echo/say");

    let connect = client.connect(&url).await.expect("connect failed");
    for i in 0..5 {
        let request = Request::post(url.clone(), format!("hello {i}").into_bytes()).with_keep_alive(true);
        let response = connect.launch_request(request, false).await.expect("request failed");
        println!("-> {}", String::from_utf8_lossy(&response.body));
    }

    let _ = connect.disconnect().await;
    server.stop();
    hsys.terminate_all().await?;
    timer.shutdown();
    Ok(())
}
