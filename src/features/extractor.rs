use super::FeatureVector;
use crate::capture::PacketRecord;

/// Build the model input for one packet. `density` is the window count for the packet's source,
/// taken after the packet itself was recorded.
pub fn extract(pkt: &PacketRecord, density: usize) -> FeatureVector {
    let density = density as f32;
    FeatureVector {
        values: [
            pkt.length as f32,
            f32::from(pkt.protocol.id()),
            density,
            density,
        ],
    }
}
