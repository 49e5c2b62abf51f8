mod cli;
mod demo;
mod infra;
mod routes;
mod rubric;
mod server;

use qualify::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
