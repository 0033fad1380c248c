pub mod chat {
    tonic::include_proto!("chat.v1");

    /// Serialized file descriptor set, registered with the reflection
    /// service when the server runs locally.
    pub const FILE_DESCRIPTOR_SET: &[u8] =
        include_bytes!(concat!(env!("OUT_DIR"), "/chat_descriptor.bin"));
}
