use pipeline_devtools::app;

fn main() -> anyhow::Result<()> {
    app::main()
}
