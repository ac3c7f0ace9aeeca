mod sim;

fn main() -> anyhow::Result<()> {
    sim::run()
}
