//! Version command implementation

use nshold_namespace::DEFAULT_ROOT;

pub fn execute() {
    println!("nshold");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!("Default root: {DEFAULT_ROOT}");
    println!();
    println!("Namespaces:");
    println!("  - mount");
    println!("  - network");
    println!("  - ipc");
}
