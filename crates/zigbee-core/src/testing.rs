//! Test doubles for the device link and cluster hooks

use crate::attribute::AttributeDescriptor;
use crate::hooks::{append_attribute_value, ClusterHooks, HookError};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use zcl_protocol::{status, Side, ZclDataType, ZclError, ZclFrame, ZclFrameListener, ZigbeeDevice, ZclValue};

/// Device answering `invoke` from a scripted queue
///
/// An empty queue behaves like a device that never answers.
pub(crate) struct MockDevice {
    replies: Mutex<VecDeque<Result<Option<ZclFrame>, ZclError>>>,
    invoked: Mutex<Vec<ZclFrame>>,
    posted: Mutex<Vec<ZclFrame>>,
    accept_posts: AtomicBool,
    listeners: Mutex<Vec<(u16, Side)>>,
}

impl MockDevice {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::new()),
            invoked: Mutex::new(Vec::new()),
            posted: Mutex::new(Vec::new()),
            accept_posts: AtomicBool::new(true),
            listeners: Mutex::new(Vec::new()),
        })
    }

    /// Queue a reply built from raw ZCL bytes
    pub(crate) fn reply(&self, data: &[u8]) {
        let frame = ZclFrame::parse(data).unwrap();
        self.replies.lock().unwrap().push_back(Ok(Some(frame)));
    }

    pub(crate) fn reply_timeout(&self) {
        self.replies.lock().unwrap().push_back(Ok(None));
    }

    pub(crate) fn reply_error(&self, err: ZclError) {
        self.replies.lock().unwrap().push_back(Err(err));
    }

    pub(crate) fn reject_posts(&self) {
        self.accept_posts.store(false, Ordering::SeqCst);
    }

    pub(crate) fn invoked(&self) -> Vec<ZclFrame> {
        self.invoked.lock().unwrap().clone()
    }

    pub(crate) fn posted(&self) -> Vec<ZclFrame> {
        self.posted.lock().unwrap().clone()
    }

    pub(crate) fn listeners(&self) -> Vec<(u16, Side)> {
        self.listeners.lock().unwrap().clone()
    }
}

#[async_trait]
impl ZigbeeDevice for MockDevice {
    async fn invoke(
        &self,
        _profile_id: Option<u16>,
        _cluster_id: u16,
        frame: ZclFrame,
    ) -> Result<Option<ZclFrame>, ZclError> {
        self.invoked.lock().unwrap().push(frame);
        self.replies.lock().unwrap().pop_front().unwrap_or(Ok(None))
    }

    async fn post(&self, _profile_id: Option<u16>, _cluster_id: u16, frame: ZclFrame) -> bool {
        self.posted.lock().unwrap().push(frame);
        self.accept_posts.load(Ordering::SeqCst)
    }

    fn set_listener(&self, cluster_id: u16, side: Side, _listener: Arc<dyn ZclFrameListener>) {
        let mut listeners = self.listeners.lock().unwrap();
        listeners.retain(|entry| *entry != (cluster_id, side));
        listeners.push((cluster_id, side));
    }

    fn remove_listener(&self, cluster_id: u16, side: Side) {
        self.listeners
            .lock()
            .unwrap()
            .retain(|entry| *entry != (cluster_id, side));
    }
}

pub(crate) const MEASURED_VALUE: u16 = 0x0000;
pub(crate) const ON_TIME: u16 = 0x0010;
pub(crate) const LEVEL: u16 = 0x0020;
pub(crate) const POWER: u16 = 0x0021;
pub(crate) const ENABLED: u16 = 0x0030;
pub(crate) const LABEL: u16 = 0x0040;
/// Read-only attribute
pub(crate) const SERIAL: u16 = 0x0041;
/// Attribute whose backing appliance is offline
pub(crate) const BROKEN: u16 = 0x00FF;
/// Attribute the device refuses to disclose
pub(crate) const SECRET: u16 = 0x00FE;

pub(crate) const TEST_ATTRIBUTES: &[AttributeDescriptor] = &[
    AttributeDescriptor::new(MEASURED_VALUE, "MeasuredValue", ZclDataType::Int16, true),
    AttributeDescriptor::new(ON_TIME, "OnTime", ZclDataType::Uint8, false),
    AttributeDescriptor::new(LEVEL, "Level", ZclDataType::Uint8, true),
    AttributeDescriptor::new(POWER, "Power", ZclDataType::Uint16, true),
    AttributeDescriptor::new(ENABLED, "Enabled", ZclDataType::Boolean, true),
    AttributeDescriptor::new(LABEL, "Label", ZclDataType::CharString, false),
    AttributeDescriptor::new(SERIAL, "Serial", ZclDataType::CharString, false),
    AttributeDescriptor::new(BROKEN, "Broken", ZclDataType::Uint8, false),
    AttributeDescriptor::new(SECRET, "Secret", ZclDataType::Uint8, false),
];

/// Hooks backed by an in-memory attribute table
pub(crate) struct TestHooks {
    values: Mutex<HashMap<u16, ZclValue>>,
}

impl TestHooks {
    pub(crate) fn new() -> Arc<Self> {
        let mut values = HashMap::new();
        values.insert(MEASURED_VALUE, ZclValue::Signed(2150));
        values.insert(LEVEL, ZclValue::Unsigned(42));
        values.insert(LABEL, ZclValue::String("kitchen".to_string()));
        values.insert(SERIAL, ZclValue::String("A1".to_string()));
        Arc::new(Self {
            values: Mutex::new(values),
        })
    }

    pub(crate) fn value(&self, attr_id: u16) -> Option<ZclValue> {
        self.values.lock().unwrap().get(&attr_id).cloned()
    }
}

impl ClusterHooks for TestHooks {
    fn attributes(&self) -> &[AttributeDescriptor] {
        TEST_ATTRIBUTES
    }

    fn read_attribute_response_size(&self, attr_id: u16) -> Result<usize, HookError> {
        let descriptor = self
            .attribute_descriptor_by_id(attr_id)
            .ok_or(HookError::UnsupportedOperation)?;
        match (descriptor.data_type.fixed_size(), self.value(attr_id)) {
            (Some(size), _) => Ok(1 + size),
            (None, Some(ZclValue::String(s))) => Ok(2 + s.len()),
            (None, _) => Err(HookError::UnsupportedOperation),
        }
    }

    fn fill_attribute_record(&self, frame: &mut ZclFrame, attr_id: u16) -> Result<bool, HookError> {
        match attr_id {
            BROKEN => {
                // partial output that must not reach the wire
                frame.append_u8(status::SUCCESS)?;
                Err(HookError::Appliance("appliance offline".to_string()))
            }
            SECRET => Err(HookError::Status(status::NOT_AUTHORIZED)),
            _ => {
                let Some(descriptor) = self.attribute_descriptor_by_id(attr_id) else {
                    return Ok(false);
                };
                let Some(value) = self.value(attr_id) else {
                    return Err(HookError::UnsupportedOperation);
                };
                append_attribute_value(frame, descriptor.data_type, &value)?;
                Ok(true)
            }
        }
    }

    fn write_attribute(&self, frame: &mut ZclFrame, attr_id: u16, data_type: u8) -> Result<u8, HookError> {
        match attr_id {
            BROKEN => Err(HookError::Appliance("appliance offline".to_string())),
            SERIAL => {
                ZclDataType::from_tag(data_type)?.skip(frame)?;
                Ok(status::READ_ONLY)
            }
            _ => {
                let Some(descriptor) = self.attribute_descriptor_by_id(attr_id) else {
                    return Ok(status::UNSUPPORTED_ATTRIBUTE);
                };
                if descriptor.data_type as u8 != data_type {
                    ZclDataType::from_tag(data_type)?.skip(frame)?;
                    return Ok(status::INVALID_DATA_TYPE);
                }
                let value = descriptor.data_type.parse(frame)?;
                self.values.lock().unwrap().insert(attr_id, value);
                Ok(status::SUCCESS)
            }
        }
    }
}

/// Raw frame bytes: frame control, sequence, command id, payload
pub(crate) fn frame_bytes(frame_control: u8, sequence: u8, command_id: u8, payload: &[u8]) -> Vec<u8> {
    let mut data = vec![frame_control, sequence, command_id];
    data.extend_from_slice(payload);
    data
}
