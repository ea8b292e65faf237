/// CRC-16/CCITT-FALSE (poly 0x1021, init 0xFFFF, без отражения).
///
/// Так считают контрольную сумму симуляторы флота: по байтам `0..28`
/// пакета. Ингестор поле только декодирует и не сверяет.
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}
