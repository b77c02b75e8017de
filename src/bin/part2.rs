use anyhow::{Context, Result};
use clap::Parser;
use day17::{CLIArgs, CrucibleRule, SearchLimit};

fn main() -> Result<()> {
    env_logger::init();
    let args = CLIArgs::parse();
    let map = day17::read_heat_map(&args.input_path).with_context(|| {
        format!(
            "Failed to read heat map from given file({}).",
            args.input_path.display()
        )
    })?;

    let (from, to) = (map.top_left(), map.bottom_right());
    let (res, elapsed) = day17::measure(|| {
        map.min_heat_loss_path(
            &from,
            &to,
            &CrucibleRule::ultra(),
            SearchLimit::from(args.max_steps),
        )
    });
    let (min_loss, path) = res
        .with_context(|| format!("Failed to move the ultra crucible from {} to {}.", from, to))?;

    if args.show_path {
        println!("{}", map.draw_path(&path));
    }
    println!(
        "The minimum heat loss of moving the ultra crucible from {} to {} is {}.",
        from, to, min_loss
    );
    println!("Search took {:?}.", elapsed);

    Ok(())
}
