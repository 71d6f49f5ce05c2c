//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# cdim relay configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[server]
# host = "0.0.0.0"
# port = 3000              # 1-65535, PORT env and --port override this
# outbox_capacity = 256    # 1-65536 frames queued per connection

[history]
# max_messages = 500       # 1-100000 retained per pair
# replay_limit = 100       # 0-max_messages sent in the welcome event

[logging]
# level = "info"           # trace, debug, info, warn, error
"##
    .to_string()
}
