//! 设备节点树。
//!
//! 节点分三类：根（Root）、房间（Room）、开关（Switch）。节点存放在 `DeviceTree`
//! 的数组中，子节点通过 `NodeId` 引用，同一个开关既是房间的子节点，也是根的
//! 功能子节点，但只存一份。
//!
//! 两条父子轴：
//! - 位置轴（locational）：根 → 房间 → 开关
//! - 功能轴（functional）：根 → 开关；房间 → 开关

use crate::{ASSET_TYPE_ROOM, ASSET_TYPE_ROOT, ASSET_TYPE_SWITCH, AssetId};
use std::collections::BTreeMap;

/// 树内节点下标。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// 本轮已解析的平台资产 ID（按项目）。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetIds(BTreeMap<String, AssetId>);

impl AssetIds {
    pub fn get(&self, project_id: &str) -> Option<AssetId> {
        self.0.get(project_id).copied()
    }

    pub fn set(&mut self, project_id: &str, asset_id: AssetId) {
        self.0.insert(project_id.to_string(), asset_id);
    }
}

/// 资产的公共描述。
pub trait Asset {
    /// 本地唯一标识（厂商设备 ID / 房间 ID）。
    fn identifier(&self) -> &str;
    fn name(&self) -> &str;
    fn description(&self) -> String;
    fn asset_type(&self) -> &'static str;

    /// 全局标识：资产类型 + "_" + 本地标识，作为创建资产的幂等键。
    fn global_identifier(&self) -> String {
        format!("{}_{}", self.asset_type(), self.identifier())
    }
}

/// 位置轴上的子节点。
pub trait LocationalNode: Asset {
    fn locational_children(&self) -> &[NodeId];
}

/// 功能轴上的子节点。
pub trait FunctionalNode: Asset {
    fn functional_children(&self) -> &[NodeId];
}

/// 根资产，每个项目一个。
#[derive(Debug, Clone, Default)]
pub struct RootNode {
    pub rooms: Vec<NodeId>,
    pub switches: Vec<NodeId>,
    pub asset_ids: AssetIds,
}

impl Asset for RootNode {
    fn identifier(&self) -> &str {
        "root"
    }

    fn name(&self) -> &str {
        "myStrom"
    }

    fn description(&self) -> String {
        "Root asset for myStrom devices".to_string()
    }

    fn asset_type(&self) -> &'static str {
        ASSET_TYPE_ROOT
    }

    /// 根在项目内唯一，直接使用资产类型。
    fn global_identifier(&self) -> String {
        ASSET_TYPE_ROOT.to_string()
    }
}

impl LocationalNode for RootNode {
    fn locational_children(&self) -> &[NodeId] {
        &self.rooms
    }
}

impl FunctionalNode for RootNode {
    fn functional_children(&self) -> &[NodeId] {
        &self.switches
    }
}

/// 房间。
#[derive(Debug, Clone, Default)]
pub struct RoomNode {
    pub id: String,
    pub name: String,
    pub switches: Vec<NodeId>,
    pub asset_ids: AssetIds,
}

impl Asset for RoomNode {
    fn identifier(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        format!("{} ({})", self.name, self.id)
    }

    fn asset_type(&self) -> &'static str {
        ASSET_TYPE_ROOM
    }
}

impl LocationalNode for RoomNode {
    fn locational_children(&self) -> &[NodeId] {
        &self.switches
    }
}

impl FunctionalNode for RoomNode {
    fn functional_children(&self) -> &[NodeId] {
        &self.switches
    }
}

/// 智能插座。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SwitchNode {
    pub id: String,
    pub name: String,
    /// 功率（W）。
    pub power: f64,
    /// 温度（°C）。
    pub temperature: f64,
    /// 继电器状态：1 开，0 关。
    pub relay: i64,
    pub asset_ids: AssetIds,
}

impl SwitchNode {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// 过滤规则可引用的字段。
    pub fn filter_fields(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("id".to_string(), self.id.clone()),
            ("name".to_string(), self.name.clone()),
            ("power".to_string(), self.power.to_string()),
            ("temperature".to_string(), self.temperature.to_string()),
            ("relay".to_string(), self.relay.to_string()),
        ])
    }
}

impl Asset for SwitchNode {
    fn identifier(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        format!("{} ({})", self.name, self.id)
    }

    fn asset_type(&self) -> &'static str {
        ASSET_TYPE_SWITCH
    }
}

impl LocationalNode for SwitchNode {
    fn locational_children(&self) -> &[NodeId] {
        &[]
    }
}

impl FunctionalNode for SwitchNode {
    fn functional_children(&self) -> &[NodeId] {
        &[]
    }
}

/// 节点变体。
#[derive(Debug, Clone)]
pub enum DeviceNode {
    Root(RootNode),
    Room(RoomNode),
    Switch(SwitchNode),
}

impl DeviceNode {
    fn inner(&self) -> &dyn NodeCapabilities {
        match self {
            DeviceNode::Root(node) => node,
            DeviceNode::Room(node) => node,
            DeviceNode::Switch(node) => node,
        }
    }

    pub fn asset_ids(&self) -> &AssetIds {
        match self {
            DeviceNode::Root(node) => &node.asset_ids,
            DeviceNode::Room(node) => &node.asset_ids,
            DeviceNode::Switch(node) => &node.asset_ids,
        }
    }

    pub fn asset_ids_mut(&mut self) -> &mut AssetIds {
        match self {
            DeviceNode::Root(node) => &mut node.asset_ids,
            DeviceNode::Room(node) => &mut node.asset_ids,
            DeviceNode::Switch(node) => &mut node.asset_ids,
        }
    }

    /// 厂商侧设备 ID，仅开关有。
    pub fn provider_id(&self) -> Option<&str> {
        match self {
            DeviceNode::Switch(node) => Some(&node.id),
            _ => None,
        }
    }
}

trait NodeCapabilities: LocationalNode + FunctionalNode {}

impl<T: LocationalNode + FunctionalNode> NodeCapabilities for T {}

impl Asset for DeviceNode {
    fn identifier(&self) -> &str {
        self.inner().identifier()
    }

    fn name(&self) -> &str {
        self.inner().name()
    }

    fn description(&self) -> String {
        self.inner().description()
    }

    fn asset_type(&self) -> &'static str {
        self.inner().asset_type()
    }

    fn global_identifier(&self) -> String {
        self.inner().global_identifier()
    }
}

impl LocationalNode for DeviceNode {
    fn locational_children(&self) -> &[NodeId] {
        self.inner().locational_children()
    }
}

impl FunctionalNode for DeviceNode {
    fn functional_children(&self) -> &[NodeId] {
        self.inner().functional_children()
    }
}

/// 一次抓取得到的设备树，根固定在下标 0。
#[derive(Debug, Clone)]
pub struct DeviceTree {
    nodes: Vec<DeviceNode>,
}

impl Default for DeviceTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![DeviceNode::Root(RootNode::default())],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&DeviceNode> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut DeviceNode> {
        self.nodes.get_mut(id.0)
    }

    /// 查找或新增房间；同一房间 ID 只建一个节点。
    pub fn add_room(&mut self, room_id: &str, name: &str) -> NodeId {
        let existing = self.nodes.iter().position(
            |node| matches!(node, DeviceNode::Room(room) if room.id == room_id),
        );
        if let Some(index) = existing {
            return NodeId(index);
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(DeviceNode::Room(RoomNode {
            id: room_id.to_string(),
            name: name.to_string(),
            ..RoomNode::default()
        }));
        if let Some(DeviceNode::Root(root)) = self.nodes.first_mut() {
            root.rooms.push(id);
        }
        id
    }

    /// 新增开关：挂到根的功能轴，若有房间再挂到房间下。
    pub fn add_switch(&mut self, switch: SwitchNode, room: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(DeviceNode::Switch(switch));
        if let Some(DeviceNode::Root(root)) = self.nodes.first_mut() {
            root.switches.push(id);
        }
        if let Some(room) = room {
            if let Some(DeviceNode::Room(room)) = self.nodes.get_mut(room.0) {
                room.switches.push(id);
            }
        }
        id
    }

    pub fn switches(&self) -> impl Iterator<Item = &SwitchNode> {
        self.nodes.iter().filter_map(|node| match node {
            DeviceNode::Switch(switch) => Some(switch),
            _ => None,
        })
    }

    pub fn into_switches(self) -> Vec<SwitchNode> {
        self.nodes
            .into_iter()
            .filter_map(|node| match node {
                DeviceNode::Switch(switch) => Some(switch),
                _ => None,
            })
            .collect()
    }
}
