use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    docgen_lib::run().await
}
