fn main() -> anyhow::Result<()> {
    starsplit_cli::cli::run()
}
