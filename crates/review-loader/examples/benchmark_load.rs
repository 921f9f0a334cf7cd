use review_loader::ReviewIndex;
use std::path::PathBuf;
use std::time::Instant;

fn main() {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/movies.txt.gz"));

    println!("Loading review log from {}...\n", path.display());

    let start = Instant::now();
    let index = ReviewIndex::load_from_path(&path)
        .expect("Failed to load review log");
    let elapsed = start.elapsed();

    let (users, products, ratings) = index.counts();

    println!("\n=== Load Complete ===");
    println!("Time taken: {:?}", elapsed);
    println!("Reviews: {}", index.total_reviews());
    println!("Users: {}", users);
    println!("Products: {}", products);
    println!("Ratings: {}", ratings);
    println!("\nPerformance: {:.0} ratings/second",
             ratings as f64 / elapsed.as_secs_f64());
}
