use fleetgate_core::config::{AppConfig, LoadOptions};
use fleetgate_core::security::hash_password;
use fleetgate_db::repositories::{SqlBookingRepository, SqlUserRepository, SqlVehicleRepository};
use fleetgate_db::{connect_from_config, migrations, DemoSeedDataset, SeedResult, SeedTargets};

use crate::commands::{current_thread_runtime, CommandResult};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match current_thread_runtime("seed") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_from_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let users = SqlUserRepository::new(pool.clone());
        let vehicles = SqlVehicleRepository::new(pool.clone());
        let bookings = SqlBookingRepository::new(pool.clone());
        let loaded: Result<SeedResult, (&'static str, String, u8)> = DemoSeedDataset::load(
            SeedTargets { users: &users, vehicles: &vehicles, bookings: &bookings },
            |password| hash_password(password).map_err(|error| error.to_string()),
        )
        .await
        .map_err(|error| ("seed_execution", error.to_string(), 6u8));

        pool.close().await;
        loaded
    });

    match result {
        Ok(seeded) => CommandResult::success_with_data(
            "seed",
            summary(&seeded),
            serde_json::to_value(&seeded).ok(),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn summary(seeded: &SeedResult) -> String {
    if *seeded == SeedResult::default() {
        return "demo dataset already present; nothing to add".to_string();
    }
    format!(
        "demo dataset loaded: {} users, {} vehicles, {} bookings",
        seeded.users_created, seeded.vehicles_created, seeded.bookings_created
    )
}
