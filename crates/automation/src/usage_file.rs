/// Platform action to take for a usage file in a given lifecycle state.
///
/// The dispatch layer maps each tag to the corresponding platform call;
/// this replaces the SDK's sentinel-exception control flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileAction {
    /// Upload the file to the platform.
    Submit,
    /// Confirm the file with the given message.
    Accept { message: String },
    /// Remove the file.
    Delete,
    /// Leave the file alone.
    Skip,
}

/// Decides what to do with a usage file based on its wire status.
pub fn dispatch_usage_file(status: &str) -> FileAction {
    match status {
        "ready" => FileAction::Submit,
        "pending" => FileAction::Accept {
            message: "Automatically confirmed".to_string(),
        },
        "invalid" => FileAction::Delete,
        _ => FileAction::Skip,
    }
}
