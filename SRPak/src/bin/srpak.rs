fn main() -> anyhow::Result<()> {
    srpak::cli::run_cli()
}
