#[tokio::main]
async fn main() -> std::io::Result<()> {
    blast_arena::run_with_config().await
}
