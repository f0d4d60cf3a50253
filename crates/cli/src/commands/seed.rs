use procure_db::{RoleSeedDataset, SeedResult, VerificationResult};

use crate::commands::{build_runtime, load_config, open_database, CommandResult, Failure};

pub fn run() -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("seed") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };
    let roles = config.workflow_roles();

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;

        let seed_result = RoleSeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 6u8))?;

        // Verification runs against the configured roles, not the seeded ones.
        let verification = RoleSeedDataset::verify(&pool, &roles)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let run_result: Result<SeedResult, Failure> = if verification.all_present {
            Ok(seed_result)
        } else {
            Err(("seed_verification", verification_message(&verification), 6u8))
        };

        pool.close().await;
        run_result
    });

    match result {
        Ok(seeded) => CommandResult::success("seed", summary(&seeded)),
        Err(failure) => CommandResult::from_failure("seed", failure),
    }
}

fn summary(seeded: &SeedResult) -> String {
    let roles = seeded.roles_seeded.iter().map(|role| format!("  - {role}")).collect::<Vec<_>>();
    format!(
        "seed dataset loaded: {} users, sample request {}\n{}",
        seeded.users_seeded.len(),
        seeded.request_id,
        roles.join("\n")
    )
}

fn verification_message(verification: &VerificationResult) -> String {
    let failed_checks = verification.failed_checks();
    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
