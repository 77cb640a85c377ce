//! Gates command implementation.

use console::style;

use arvak_gpusim::GateRegistry;

/// Execute the gates command.
pub fn execute() {
    let registry = GateRegistry::standard();
    println!(
        "{} Registered gates ({}):\n",
        style("Arvak GPU-Sim").cyan().bold(),
        registry.len()
    );
    println!(
        "  {:<22} {:>8} {:>8} {:>7}",
        style("name").bold(),
        "controls",
        "targets",
        "params"
    );

    for name in registry.names() {
        let Some(spec) = registry.get(name) else {
            continue;
        };
        println!(
            "  {:<22} {:>8} {:>8} {:>7}",
            style(name).green(),
            spec.controls,
            spec.targets,
            spec.params
        );
    }
}
