use cucumber::given;

use crate::cucumber::{topup_world::TopupSystem, TopupWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut TopupWorld) {
    let system = TopupSystem::new().await;
    world.system = Some(system);
}
