fn main() -> anyhow::Result<()> {
    theme_feed::cli::run()
}
