fn main() -> anyhow::Result<()> {
    filmtui::cli::run()
}
