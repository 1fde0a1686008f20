//! 厂商报文 → 设备节点。

use crate::error::BrokerError;
use crate::models::{DeviceV1, DeviceV2, is_supported_switch, relay_from_state};
use domain::{DeviceTree, SwitchNode};
use mystrom_filter::CompiledFilter;
use tracing::debug;

/// 由 v1 设备列表构建设备树。
///
/// 不支持的设备类型直接忽略；未通过过滤的开关不入树。过滤错误中止整批。
/// 无房间的开关只挂在根的功能轴上。
pub fn build_tree(
    devices: Vec<DeviceV1>,
    filter: &CompiledFilter,
) -> Result<DeviceTree, BrokerError> {
    let mut tree = DeviceTree::new();
    for device in devices {
        if !is_supported_switch(&device.device_type) {
            continue;
        }
        let switch = SwitchNode {
            power: device.power.unwrap_or_default(),
            temperature: device.wifi_switch_temp.unwrap_or_default(),
            relay: relay_from_state(&device.state),
            ..SwitchNode::new(device.id, device.name)
        };
        if !filter.matches(&switch.filter_fields())? {
            debug!(
                target: "mystrom.broker",
                device_id = %switch.id,
                "device_filtered_out"
            );
            continue;
        }
        let room = device
            .room
            .filter(|room| !room.id.is_empty())
            .map(|room| tree.add_room(&room.id, &room.name));
        tree.add_switch(switch, room);
    }
    Ok(tree)
}

/// v2 设备列表转换为开关读数。
pub fn switches_from_v2(devices: Vec<DeviceV2>) -> Vec<SwitchNode> {
    devices
        .into_iter()
        .filter(|device| is_supported_switch(&device.device_type))
        .map(|device| SwitchNode {
            power: device.power.unwrap_or_default(),
            temperature: device.temperature.unwrap_or_default(),
            relay: relay_from_state(&device.state),
            ..SwitchNode::new(device.id, device.name)
        })
        .collect()
}
