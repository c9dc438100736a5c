/// message throughput benchmark: two actors bouncing a counter body back and forth.
/// run with "cargo run --release --example benchmark_ping_pong"

use anyhow::Result;
use litebus_actor::{ActorBehavior, ActorContext, ActorSystem, Message};
use litebus_async::Promise;
use litebus_timer::TimerService;
use std::sync::Arc;
use std::time::Instant;

const ROUNDS: u64 = 200_000;

struct Player {
    name: String,
    done: Option<Promise<u64>>,
}

impl ActorBehavior for Player {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn init(&mut self, ctx: &mut ActorContext) {
        ctx.receive::<Player, _>("ball", |actor, ctx, msg| {
            let round = u64::from_le_bytes(msg.body.try_into().unwrap_or([0; 8]));
            if round < ROUNDS {
                ctx.send(&msg.from, "ball", (round + 1).to_le_bytes().to_vec()).unwrap();
            } else if let Some(done) = actor.done.take() {
                done.set_value(round);
            }
        });
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let timer = Arc::new(TimerService::new());
    timer.run()?;

    let sys = ActorSystem::new("bench", timer.clone());
    let hsys = sys.clone_handle();

    let done = Promise::new();
    let finished = done.future();

    // the ball carries an even round number whenever pong holds it, so pong sees the
    // final round
    let ping = hsys.spawn(Player { name: "ping".to_string(), done: None }, true, true)?;
    let pong = hsys.spawn(Player { name: "pong".to_string(), done: Some(done) }, true, true)?;

    let start = Instant::now();
    hsys.send(&pong, Message::kmsg(ping.clone(), pong.clone(), "ball", 0u64.to_le_bytes().to_vec()))?;

    let rounds = finished.await.unwrap_or(0);
    let elapsed = start.elapsed();

    println!(
        "{} msgs in {:.3}s -> {:.0} msg/sec",
        rounds,
        elapsed.as_secs_f64(),
        rounds as f64 / elapsed.as_secs_f64()
    );

    hsys.terminate_all().await?;
    timer.shutdown();
    Ok(())
}
