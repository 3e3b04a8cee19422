fn main() {
    scour_tools::cli::run();
}
