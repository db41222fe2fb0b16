use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match coursegate_cli::cli::app::run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
