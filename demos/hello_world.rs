//! Hello World example - start a world and synchronize every rank.
//!
//! Run with: cargo run --example hello_world -- 4

use ferropi::{ReduceOp, Result, Runtime};

fn main() -> Result<()> {
    let size = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(ferropi::launcher::default_workers);

    let runtime = Runtime::new(size)?;
    runtime.run(|world| {
        let rank = world.rank();
        println!("Hello from rank {} of {}", rank, world.size());

        // Everyone counts in before anyone leaves
        let present = world.allreduce_scalar(1i32, ReduceOp::Sum)?;
        world.barrier()?;

        if rank == 0 {
            println!("\nAll {present} ranks reported in.");
        }
        Ok(())
    })?;

    Ok(())
}
