use hostsync::error::SyncError;

fn main() {
    if let Err(e) = hostsync::cli::run() {
        match e.downcast_ref::<SyncError>() {
            Some(sync_err) => {
                eprintln!("Error: {sync_err}");
                std::process::exit(sync_err.exit_code());
            }
            None => {
                eprintln!("Error: {e:#}");
                std::process::exit(1);
            }
        }
    }
}
