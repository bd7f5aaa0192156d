//! Dialogue state registry.
//!
//! Every conversation state, the flow that owns it, where "back" leads,
//! and which states persist the draft on an affirmative answer.

use serde::{Deserialize, Serialize};

/// Where a phone number's conversation currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChatState {
    // Menu browsing
    Start,
    MainMenu,
    MenuToday,
    MenuTodayDetails,
    MenuWeek,
    MenuWeekDetails,
    MenuAbout,
    MenuSpecial,

    // Event creation: shared prefix
    CreateEventType,
    CreateEventFreeText,
    CreateEventTitle,
    CreateEventVenue,
    CreateEventAddress,
    CreateEventDate,

    // Event creation: class branch
    CreateClassSingleOrMultiple,
    CreateClassTime,
    CreateClassLevel,
    CreateClassAddAnother,
    CreateClassPractice,
    CreateClassPracticeTime,

    // Event creation: milonga branch
    CreateMilongaTime,
    CreateMilongaPreClass,
    CreateMilongaPreClassTime,
    CreateMilongaShow,
    CreateMilongaShowDetails,

    // Event creation: special event branch
    CreateSpecialTime,

    // Event creation: reconverged tail
    CreateOrganizerSelf,
    CreateOrganizerSearch,
    CreateOrganizerSelect,
    CreateOrganizerOneTimeName,
    CreateOrganizerAddAnother,
    CreateEventRecurrence,
    CreateEventContact,
    CreateEventContactPhone,
    CreateEventReminder,
    CreateEventReminderPhone,
    CreateEventDescription,
    CreateEventPricing,
    CreateEventPricingType,
    CreateEventPricingDetail,
    CreateEventPricingAmount,
    CreateEventPricingAddMore,
    CreateEventConfirmation,

    // Teacher creation
    NewTeacherName,
    NewTeacherDetails,
    NewTeacherPassword,
    NewTeacherConfirmation,
    OtherTeacherPhone,
    OtherTeacherName,
    OtherTeacherDetails,
    OtherTeacherConfirmation,
}

/// The three disjoint sub-dialogues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flow {
    Menu,
    EventCreation,
    TeacherCreation,
}

pub const MENU_STATES: &[ChatState] = &[
    ChatState::Start,
    ChatState::MainMenu,
    ChatState::MenuToday,
    ChatState::MenuTodayDetails,
    ChatState::MenuWeek,
    ChatState::MenuWeekDetails,
    ChatState::MenuAbout,
    ChatState::MenuSpecial,
];

pub const EVENT_CREATION_STATES: &[ChatState] = &[
    ChatState::CreateEventType,
    ChatState::CreateEventFreeText,
    ChatState::CreateEventTitle,
    ChatState::CreateEventVenue,
    ChatState::CreateEventAddress,
    ChatState::CreateEventDate,
    ChatState::CreateClassSingleOrMultiple,
    ChatState::CreateClassTime,
    ChatState::CreateClassLevel,
    ChatState::CreateClassAddAnother,
    ChatState::CreateClassPractice,
    ChatState::CreateClassPracticeTime,
    ChatState::CreateMilongaTime,
    ChatState::CreateMilongaPreClass,
    ChatState::CreateMilongaPreClassTime,
    ChatState::CreateMilongaShow,
    ChatState::CreateMilongaShowDetails,
    ChatState::CreateSpecialTime,
    ChatState::CreateOrganizerSelf,
    ChatState::CreateOrganizerSearch,
    ChatState::CreateOrganizerSelect,
    ChatState::CreateOrganizerOneTimeName,
    ChatState::CreateOrganizerAddAnother,
    ChatState::CreateEventRecurrence,
    ChatState::CreateEventContact,
    ChatState::CreateEventContactPhone,
    ChatState::CreateEventReminder,
    ChatState::CreateEventReminderPhone,
    ChatState::CreateEventDescription,
    ChatState::CreateEventPricing,
    ChatState::CreateEventPricingType,
    ChatState::CreateEventPricingDetail,
    ChatState::CreateEventPricingAmount,
    ChatState::CreateEventPricingAddMore,
    ChatState::CreateEventConfirmation,
];

pub const TEACHER_CREATION_STATES: &[ChatState] = &[
    ChatState::NewTeacherName,
    ChatState::NewTeacherDetails,
    ChatState::NewTeacherPassword,
    ChatState::NewTeacherConfirmation,
    ChatState::OtherTeacherPhone,
    ChatState::OtherTeacherName,
    ChatState::OtherTeacherDetails,
    ChatState::OtherTeacherConfirmation,
];

impl ChatState {
    /// Every state, in declaration order.
    pub fn all() -> impl Iterator<Item = ChatState> {
        MENU_STATES
            .iter()
            .chain(EVENT_CREATION_STATES)
            .chain(TEACHER_CREATION_STATES)
            .copied()
    }

    pub fn is_menu_state(&self) -> bool {
        MENU_STATES.contains(self)
    }

    pub fn is_event_creation_state(&self) -> bool {
        EVENT_CREATION_STATES.contains(self)
    }

    pub fn is_teacher_creation_state(&self) -> bool {
        TEACHER_CREATION_STATES.contains(self)
    }

    /// Owning flow, by set membership.
    pub fn flow(&self) -> Flow {
        if self.is_event_creation_state() {
            Flow::EventCreation
        } else if self.is_teacher_creation_state() {
            Flow::TeacherCreation
        } else {
            Flow::Menu
        }
    }

    /// Confirmation states, where an affirmative answer persists the draft.
    pub fn is_flow_complete(&self) -> bool {
        matches!(
            self,
            Self::CreateEventConfirmation
                | Self::NewTeacherConfirmation
                | Self::OtherTeacherConfirmation
        )
    }

    /// Static navigational predecessor for "0"/"volver".
    ///
    /// `None` means no predecessor is defined here; the owning flow decides
    /// (flow entry points, and the branch reconvergence point whose
    /// predecessor depends on the event type).
    pub fn back(&self) -> Option<ChatState> {
        use ChatState::*;
        let previous = match self {
            MenuToday | MenuWeek | MenuAbout | MenuSpecial => MainMenu,
            MenuTodayDetails => MenuToday,
            MenuWeekDetails => MenuWeek,

            CreateEventFreeText | CreateEventTitle => CreateEventType,
            CreateEventVenue => CreateEventTitle,
            CreateEventAddress => CreateEventVenue,
            CreateEventDate => CreateEventAddress,

            CreateClassSingleOrMultiple => CreateEventDate,
            CreateClassTime => CreateClassSingleOrMultiple,
            CreateClassLevel => CreateClassTime,
            CreateClassAddAnother => CreateClassLevel,
            CreateClassPractice => CreateClassLevel,
            CreateClassPracticeTime => CreateClassPractice,

            CreateMilongaTime => CreateEventDate,
            CreateMilongaPreClass => CreateMilongaTime,
            CreateMilongaPreClassTime => CreateMilongaPreClass,
            CreateMilongaShow => CreateMilongaPreClass,
            CreateMilongaShowDetails => CreateMilongaShow,

            CreateSpecialTime => CreateEventDate,

            CreateOrganizerSearch => CreateOrganizerSelf,
            CreateOrganizerSelect => CreateOrganizerSearch,
            CreateOrganizerOneTimeName => CreateOrganizerSearch,
            CreateOrganizerAddAnother => CreateOrganizerSelf,
            CreateEventRecurrence => CreateOrganizerAddAnother,
            CreateEventContact => CreateEventRecurrence,
            CreateEventContactPhone => CreateEventContact,
            CreateEventReminder => CreateEventContact,
            CreateEventReminderPhone => CreateEventReminder,
            CreateEventDescription => CreateEventReminder,
            CreateEventPricing => CreateEventDescription,
            CreateEventPricingType => CreateEventPricing,
            CreateEventPricingDetail => CreateEventPricingType,
            CreateEventPricingAmount => CreateEventPricingType,
            CreateEventPricingAddMore => CreateEventPricingAmount,
            CreateEventConfirmation => CreateEventPricing,

            NewTeacherDetails => NewTeacherName,
            NewTeacherPassword => NewTeacherDetails,
            NewTeacherConfirmation => NewTeacherDetails,
            OtherTeacherName => OtherTeacherPhone,
            OtherTeacherDetails => OtherTeacherName,
            OtherTeacherConfirmation => OtherTeacherDetails,

            Start | MainMenu | CreateEventType | CreateOrganizerSelf | NewTeacherName
            | OtherTeacherPhone => return None,
        };
        Some(previous)
    }
}

impl Default for ChatState {
    fn default() -> Self {
        Self::Start
    }
}

impl std::fmt::Display for ChatState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ChatState::*;
        let s = match self {
            Start => "START",
            MainMenu => "MAIN_MENU",
            MenuToday => "MENU_TODAY",
            MenuTodayDetails => "MENU_TODAY_DETAILS",
            MenuWeek => "MENU_WEEK",
            MenuWeekDetails => "MENU_WEEK_DETAILS",
            MenuAbout => "MENU_ABOUT",
            MenuSpecial => "MENU_SPECIAL",
            CreateEventType => "CREATE_EVENT_TYPE",
            CreateEventFreeText => "CREATE_EVENT_FREE_TEXT",
            CreateEventTitle => "CREATE_EVENT_TITLE",
            CreateEventVenue => "CREATE_EVENT_VENUE",
            CreateEventAddress => "CREATE_EVENT_ADDRESS",
            CreateEventDate => "CREATE_EVENT_DATE",
            CreateClassSingleOrMultiple => "CREATE_CLASS_SINGLE_OR_MULTIPLE",
            CreateClassTime => "CREATE_CLASS_TIME",
            CreateClassLevel => "CREATE_CLASS_LEVEL",
            CreateClassAddAnother => "CREATE_CLASS_ADD_ANOTHER",
            CreateClassPractice => "CREATE_CLASS_PRACTICE",
            CreateClassPracticeTime => "CREATE_CLASS_PRACTICE_TIME",
            CreateMilongaTime => "CREATE_MILONGA_TIME",
            CreateMilongaPreClass => "CREATE_MILONGA_PRE_CLASS",
            CreateMilongaPreClassTime => "CREATE_MILONGA_PRE_CLASS_TIME",
            CreateMilongaShow => "CREATE_MILONGA_SHOW",
            CreateMilongaShowDetails => "CREATE_MILONGA_SHOW_DETAILS",
            CreateSpecialTime => "CREATE_SPECIAL_TIME",
            CreateOrganizerSelf => "CREATE_ORGANIZER_SELF",
            CreateOrganizerSearch => "CREATE_ORGANIZER_SEARCH",
            CreateOrganizerSelect => "CREATE_ORGANIZER_SELECT",
            CreateOrganizerOneTimeName => "CREATE_ORGANIZER_ONE_TIME_NAME",
            CreateOrganizerAddAnother => "CREATE_ORGANIZER_ADD_ANOTHER",
            CreateEventRecurrence => "CREATE_EVENT_RECURRENCE",
            CreateEventContact => "CREATE_EVENT_CONTACT",
            CreateEventContactPhone => "CREATE_EVENT_CONTACT_PHONE",
            CreateEventReminder => "CREATE_EVENT_REMINDER",
            CreateEventReminderPhone => "CREATE_EVENT_REMINDER_PHONE",
            CreateEventDescription => "CREATE_EVENT_DESCRIPTION",
            CreateEventPricing => "CREATE_EVENT_PRICING",
            CreateEventPricingType => "CREATE_EVENT_PRICING_TYPE",
            CreateEventPricingDetail => "CREATE_EVENT_PRICING_DETAIL",
            CreateEventPricingAmount => "CREATE_EVENT_PRICING_AMOUNT",
            CreateEventPricingAddMore => "CREATE_EVENT_PRICING_ADD_MORE",
            CreateEventConfirmation => "CREATE_EVENT_CONFIRMATION",
            NewTeacherName => "NEW_TEACHER_NAME",
            NewTeacherDetails => "NEW_TEACHER_DETAILS",
            NewTeacherPassword => "NEW_TEACHER_PASSWORD",
            NewTeacherConfirmation => "NEW_TEACHER_CONFIRMATION",
            OtherTeacherPhone => "OTHER_TEACHER_PHONE",
            OtherTeacherName => "OTHER_TEACHER_NAME",
            OtherTeacherDetails => "OTHER_TEACHER_DETAILS",
            OtherTeacherConfirmation => "OTHER_TEACHER_CONFIRMATION",
        };
        write!(f, "{s}")
    }
}
