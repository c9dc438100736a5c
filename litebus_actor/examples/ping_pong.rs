/// minimal two-actor ping pong. Each actor counts down and terminates the system once
/// the round limit is reached.
/// run with "cargo run --example ping_pong"

use anyhow::Result;
use litebus_actor::{Aid, ActorBehavior, ActorContext, ActorSystem, Message};
use litebus_timer::TimerService;
use std::sync::Arc;

const MAX_ROUNDS: usize = 5;

struct Player {
    name: String,
    rounds: usize,
}

impl ActorBehavior for Player {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn init(&mut self, ctx: &mut ActorContext) {
        ctx.receive::<Player, _>("ball", |actor, ctx, msg| {
            actor.rounds += 1;
            println!("{} got the ball (round {})", ctx.aid().name(), actor.rounds);

            if actor.rounds < MAX_ROUNDS {
                ctx.send(&msg.from, "ball", Vec::new()).unwrap();
            } else {
                ctx.terminate_self().unwrap();
                let _ = ctx.hsys().terminate(&msg.from);
            }
        });
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let timer = Arc::new(TimerService::new());
    timer.run()?;

    let sys = ActorSystem::new("ping-pong", timer.clone());
    let hsys = sys.clone_handle();

    let ping = hsys.spawn(Player { name: "ping".to_string(), rounds: 0 }, true, true)?;
    let pong = hsys.spawn(Player { name: "pong".to_string(), rounds: 0 }, true, true)?;

    hsys.send(&pong, Message::kmsg(ping.clone(), pong.clone(), "ball", Vec::new()))?;

    hsys.await_actor(&ping).await;
    hsys.await_actor(&pong).await;

    timer.shutdown();
    Ok(())
}
