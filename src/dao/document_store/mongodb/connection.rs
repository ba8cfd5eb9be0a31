use std::time::Duration;

use mongodb::{Client, Database, bson::doc, options::ClientOptions};
use tokio::time::sleep;
use tracing::{info, warn};

use super::error::{MongoDaoError, MongoResult};

const MAX_CONNECT_ATTEMPTS: u32 = 10;
const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(250);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Build a client for `database_name` and wait until the server answers a ping.
pub async fn establish_connection(
    options: &ClientOptions,
    database_name: &str,
) -> MongoResult<Database> {
    let client = Client::with_options(options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(database_name);

    let mut attempt: u32 = 0;
    let mut delay = INITIAL_RETRY_DELAY;

    loop {
        attempt += 1;

        match database.run_command(doc! { "ping": 1 }).await {
            Ok(_) => {
                if attempt > 1 {
                    info!(attempt, database = database_name, "connected to MongoDB after retry");
                }
                return Ok(database);
            }
            Err(err) if attempt < MAX_CONNECT_ATTEMPTS => {
                warn!(
                    attempt,
                    wait_ms = delay.as_millis(),
                    error = %err,
                    "MongoDB ping failed while connecting; retrying"
                );
                sleep(delay).await;
                delay = (delay * 2).min(MAX_RETRY_DELAY);
            }
            Err(source) => {
                return Err(MongoDaoError::InitialPing {
                    attempts: attempt,
                    source,
                });
            }
        }
    }
}
