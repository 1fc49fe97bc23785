fn main() {
    shark_biologging::cli::run();
}
