//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - accelerator state-vector simulation",
        style("Arvak GPU-Sim").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  arvak-device      Device memory, streams and transfers");
    println!("  arvak-gpusim      Gate kernels, dispatch and sampling");
    println!("  arvak-gpusim-cli  Command-line interface");
    println!();
    println!(
        "Repository: {}",
        style("https://github.com/hiq-lab/arvak").underlined()
    );
    println!("License:    {}", style("Apache-2.0").dim());
}
