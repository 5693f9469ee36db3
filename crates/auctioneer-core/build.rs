fn main() -> Result<(), Box<dyn std::error::Error>> {
    auctioneer_build_info::emit("auctioneer-v")?;
    Ok(())
}
