use super::M65C02;

impl M65C02 {
    pub(crate) fn ld_a(&mut self, value: u8) {
        self.a = value;
        self.set_or_clear_zn_flags(value);
    }

    pub(crate) fn ld_x(&mut self, value: u8) {
        self.x = value;
        self.set_or_clear_zn_flags(value);
    }

    pub(crate) fn ld_y(&mut self, value: u8) {
        self.y = value;
        self.set_or_clear_zn_flags(value);
    }
}
