fn main() {
    // Gather build-time info (git commit, compiler) for the summary printed by the cli.
    built::write_built_file().expect("Failed to acquire build-time information");

    println!("cargo:rerun-if-changed=build.rs");
}
