use auctioneer_build_info::BuildInfo;

pub const BUILD_INFO: BuildInfo = auctioneer_build_info::get!();
