//! Value header → (context, kind) translation.
//!
//! | Header shape | Stamps present | Context | Kind |
//! |---|---|---|---|
//! | setting immediate update | none | `Setting` | `SETTING_UPDATE` |
//! | setting immediate update | acquisition + set | `MultiplexedSetting` | `SETTING_UPDATE` |
//! | setting first update | any | `Setting` | `FIRST_UPDATE` |
//! | acquisition (regular or immediate) | cycle | `CycleBoundAcquisition` | `SETTING_UPDATE` |
//! | acquisition (regular or immediate) | no cycle | `Acquisition` | `SETTING_UPDATE` |
//!
//! Acquisition updates are labelled `SETTING_UPDATE` like setting updates.
//! Consumers that need to tell them apart should match on the context
//! variant.

use paramlink_types::{
    AcquisitionContext, CycleBoundAcquisitionContext, MultiplexedSettingContext,
    NotificationContext, NotificationKind, SettingContext,
};

use crate::foreign::{HeaderShape, ValueHeader};

/// Translate a foreign header. Never fails: a missing selector only
/// surfaces when the context's selector is read.
pub fn translate(header: &ValueHeader) -> (NotificationContext, NotificationKind) {
    let selector = header.selector().map(str::to_string);
    match header.shape() {
        HeaderShape::SettingImmediateUpdate => {
            let context = if header.has_acquisition_stamp() && header.has_set_stamp() {
                NotificationContext::MultiplexedSetting(MultiplexedSettingContext::new(
                    selector,
                    header.acquisition_stamp(),
                    header.set_stamp(),
                ))
            } else {
                NotificationContext::Setting(SettingContext::new(selector))
            };
            (context, NotificationKind::SettingUpdate)
        }
        HeaderShape::SettingFirstUpdate => (
            NotificationContext::Setting(SettingContext::new(selector)),
            NotificationKind::FirstUpdate,
        ),
        HeaderShape::AcquisitionRegularUpdate | HeaderShape::AcquisitionImmediateUpdate => {
            let context = if header.has_cycle_stamp() {
                NotificationContext::CycleBoundAcquisition(CycleBoundAcquisitionContext::new(
                    selector,
                    header.acquisition_stamp(),
                    header.cycle_stamp(),
                ))
            } else {
                NotificationContext::Acquisition(AcquisitionContext::new(
                    selector,
                    header.acquisition_stamp(),
                ))
            };
            (context, NotificationKind::SettingUpdate)
        }
    }
}

#[cfg(test)]
mod tests {
    use paramlink_types::BridgeError;

    use super::*;

    const SELECTOR: &str = "some.selector.here";

    #[test]
    fn setting_immediate_update_without_stamps() {
        let (ctx, kind) = translate(&ValueHeader::setting_immediate_update(SELECTOR));
        assert!(matches!(ctx, NotificationContext::Setting(_)));
        assert_eq!(ctx.selector().unwrap(), SELECTOR);
        assert_eq!(kind, NotificationKind::SettingUpdate);
    }

    #[test]
    fn missing_selector_fails_on_read_only() {
        let (ctx, kind) = translate(&ValueHeader::setting_immediate_update(""));
        assert_eq!(kind, NotificationKind::SettingUpdate);
        assert!(matches!(ctx.selector(), Err(BridgeError::MissingSelector)));
    }

    #[test]
    fn setting_first_update() {
        let (ctx, kind) = translate(&ValueHeader::setting_first_update(21312, 13, SELECTOR));
        assert!(matches!(ctx, NotificationContext::Setting(_)));
        assert_eq!(kind, NotificationKind::FirstUpdate);
    }

    #[test]
    fn stamped_setting_immediate_update_is_multiplexed() {
        let header = ValueHeader::setting_immediate_update_stamped(21312, 1322313, SELECTOR);
        let (ctx, kind) = translate(&header);
        let NotificationContext::MultiplexedSetting(inner) = &ctx else {
            panic!("expected a multiplexed setting context, got {ctx:?}");
        };
        assert_eq!(inner.acquisition_stamp(), 21312);
        assert_eq!(inner.set_stamp(), 1322313);
        assert_eq!(kind, NotificationKind::SettingUpdate);
    }

    #[test]
    fn acquisition_with_cycle_stamp_is_cycle_bound() {
        let (ctx, kind) = translate(&ValueHeader::acquisition_regular_update(21312, 123, SELECTOR));
        assert_eq!(ctx.acquisition_stamp(), Some(21312));
        assert_eq!(ctx.cycle_stamp(), Some(123));
        assert!(matches!(ctx, NotificationContext::CycleBoundAcquisition(_)));
        assert_eq!(kind, NotificationKind::SettingUpdate);
    }

    #[test]
    fn acquisition_without_cycle_stamp() {
        let (ctx, kind) = translate(&ValueHeader::acquisition_regular_update(21312, 0, SELECTOR));
        assert!(matches!(ctx, NotificationContext::Acquisition(_)));
        assert_eq!(ctx.acquisition_stamp(), Some(21312));
        assert_eq!(ctx.selector().unwrap(), SELECTOR);
        assert_eq!(kind, NotificationKind::SettingUpdate);

        let (immediate, _) =
            translate(&ValueHeader::acquisition_immediate_update(21312, 0, SELECTOR));
        assert_eq!(immediate, ctx);
    }
}
