fn main() {
    gto_solver::cli::run();
}
