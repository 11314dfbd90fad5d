diesel::table! {
    devices (id) {
        id -> Text,
        name -> Text,
        ip -> Text,                  // unique
        device_type -> Text,         // ROUTER | SWITCH | ... | OTHER
        status -> Text,              // up | down | unknown
        status_since -> Timestamp,
        last_seen -> Nullable<Timestamp>,
        comment -> Nullable<Text>,
        position_x -> Double,
        position_y -> Double,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    system_config (id) {
        id -> Integer,               // always 1
        host -> Nullable<Text>,
        username -> Text,
        password -> Text,
        port -> Integer,
        use_tls -> Bool,
        polling_interval -> Integer, // seconds
        updated_at -> Timestamp,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    devices,
    system_config,
);
