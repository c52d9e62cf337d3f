use yamlvus_cli::yamlvus_cli;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    std::process::exit(yamlvus_cli(args));
}
